use clap::{Parser, Subcommand};
use nordigen_account::{Account, AccountManager, ApiError, Client, ErrorKind, obtain_client};
use std::error::Error;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "nordigen-cli", about = "CLI wrapper for Nordigen account helpers")]
struct Cli {
    /// Secret id; falls back to NORDIGEN_SECRET_ID env var
    #[arg(long, env = "NORDIGEN_SECRET_ID")]
    secret_id: String,

    /// Secret key; falls back to NORDIGEN_SECRET_KEY env var
    #[arg(long, env = "NORDIGEN_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Stored refresh token; a new pair is generated when absent or expired
    #[arg(long, env = "NORDIGEN_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Authenticate and print a newly issued refresh token, if any
    Token,
    /// List the accounts linked to a requisition
    Accounts {
        #[arg(long, value_name = "ID")]
        requisition_id: String,
        /// Also fetch details and balances for every account
        #[arg(long)]
        fetch: bool,
    },
    /// Show details and balances of a single account
    Account {
        #[arg(long, value_name = "ID")]
        account_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let (client, new_refresh) =
        obtain_client(&cli.secret_id, &cli.secret_key, cli.refresh_token.as_deref()).await?;
    if let Some(token) = &new_refresh {
        eprintln!("New refresh token issued: {token}");
    }

    let result = match cli.command {
        Commands::Token => {
            println!("authenticated, new refresh token: {}", new_refresh.is_some());
            Ok(())
        }
        Commands::Accounts {
            requisition_id,
            fetch,
        } => list_accounts(&client, requisition_id, fetch).await,
        Commands::Account { account_id } => show_account(&client, account_id).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            report(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn list_accounts(
    client: &Client,
    requisition_id: String,
    fetch: bool,
) -> Result<(), ApiError> {
    let manager = AccountManager::new(client, requisition_id, fetch).await?;
    println!(
        "institution_id={}, reference={}",
        manager.institution_id().unwrap_or("-"),
        manager.reference().unwrap_or("-")
    );
    for account in manager.accounts() {
        print_account(account);
    }
    Ok(())
}

async fn show_account(client: &Client, account_id: String) -> Result<(), ApiError> {
    let account = Account::new(client, account_id, true).await?;
    print_account(&account);
    Ok(())
}

fn print_account(account: &Account<'_, Client>) {
    println!(
        "{} | {} | {} | {}",
        account.id(),
        account.name(),
        account.status(),
        account.currency()
    );
    for balance in account.balances() {
        let date = balance
            .reference_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {} {} {} ({})",
            balance.balance_type, balance.amount, balance.currency, date
        );
    }
}

fn report(err: &ApiError) {
    match err.kind() {
        ErrorKind::RequisitionExpired => {
            eprintln!("Requisition expired; create a new one and re-link the accounts.")
        }
        ErrorKind::NoLinkedAccounts => {
            eprintln!("Requisition has no linked accounts; finish bank authorization first.")
        }
        _ => {}
    }
    eprintln!(
        "error ({}, status {}): {}",
        err.kind(),
        err.status_code()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        err
    );
}
