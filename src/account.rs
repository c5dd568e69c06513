use crate::client::NordigenApi;
use crate::error::ApiError;
use crate::models::{AccountDetailsResponse, Balance, BalancesResponse, UNKNOWN, or_unknown};
use log::debug;

/// A single linked bank account.
///
/// Descriptive fields read "Unknown" until fetched, and after a fetch for any
/// field the provider left out.
#[derive(Debug)]
pub struct Account<'a, C> {
    client: &'a C,
    id: String,
    name: String,
    status: String,
    currency: String,
    balances: Vec<Balance>,
}

impl<'a, C: NordigenApi> Account<'a, C> {
    /// Wrap `account_id`; with `fetch_data` the details and balances are
    /// fetched right away and any failure fails construction.
    pub async fn new(
        client: &'a C,
        account_id: impl Into<String>,
        fetch_data: bool,
    ) -> Result<Self, ApiError> {
        let mut account = Self {
            client,
            id: account_id.into(),
            name: UNKNOWN.to_string(),
            status: UNKNOWN.to_string(),
            currency: UNKNOWN.to_string(),
            balances: Vec::new(),
        };
        if fetch_data {
            account.refresh().await?;
        }
        Ok(account)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    /// Fetch details, then balances.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        self.refresh_details().await?;
        self.refresh_balances().await
    }

    /// Fetch and overwrite name, status and currency. Each falls back to
    /// "Unknown" on its own when missing or not a string.
    pub async fn refresh_details(&mut self) -> Result<(), ApiError> {
        const CONTEXT: &str = "Error retrieving account details";

        let body = self
            .client
            .account_details(&self.id)
            .await
            .map_err(|err| ApiError::from_provider(CONTEXT, err))?;
        let parsed: AccountDetailsResponse = serde_json::from_value(body).map_err(|err| {
            ApiError::unknown(format!(
                "Unexpected error while fetching account details: {err}"
            ))
        })?;

        let details = parsed.account.unwrap_or_default();
        self.name = or_unknown(details.name);
        self.status = or_unknown(details.status);
        self.currency = or_unknown(details.currency);
        debug!("Updated details for account {}", self.id);
        Ok(())
    }

    /// Fetch balances and replace the stored list wholesale.
    ///
    /// On failure the previous list is kept.
    pub async fn refresh_balances(&mut self) -> Result<(), ApiError> {
        const CONTEXT: &str = "Error retrieving account balances";

        let body = self
            .client
            .account_balances(&self.id)
            .await
            .map_err(|err| ApiError::from_provider(CONTEXT, err))?;
        let parsed: BalancesResponse = serde_json::from_value(body).map_err(|err| {
            ApiError::unknown(format!(
                "Unexpected error while fetching account balances: {err}"
            ))
        })?;

        self.balances = parsed
            .balances
            .unwrap_or_default()
            .into_iter()
            .map(Balance::from)
            .collect();
        debug!(
            "Parsed {} balances for account {}",
            self.balances.len(),
            self.id
        );
        Ok(())
    }
}
