use nordigen_account::{AccountManager, obtain_client};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let secret_id = env::var("NORDIGEN_SECRET_ID")
        .map_err(|_| "Set NORDIGEN_SECRET_ID in your environment or .env file")?;
    let secret_key = env::var("NORDIGEN_SECRET_KEY")
        .map_err(|_| "Set NORDIGEN_SECRET_KEY in your environment or .env file")?;
    let requisition_id = env::var("NORDIGEN_REQUISITION_ID")
        .map_err(|_| "Set NORDIGEN_REQUISITION_ID in your environment or .env file")?;
    let refresh_token = env::var("NORDIGEN_REFRESH_TOKEN").ok();

    let (client, new_refresh) =
        obtain_client(&secret_id, &secret_key, refresh_token.as_deref()).await?;
    if let Some(token) = new_refresh {
        println!("New refresh token issued, store it as NORDIGEN_REFRESH_TOKEN: {token}");
    }

    let manager = AccountManager::new(&client, requisition_id, true).await?;
    println!(
        "Institution {} (reference {}):",
        manager.institution_id().unwrap_or("-"),
        manager.reference().unwrap_or("-")
    );
    for account in manager.accounts() {
        println!(
            "{} | {} | {} | {}",
            account.id(),
            account.name(),
            account.status(),
            account.currency()
        );
        for balance in account.balances() {
            println!(
                "    {} {} {}",
                balance.balance_type, balance.amount, balance.currency
            );
        }
    }

    Ok(())
}
