use crate::account::Account;
use crate::client::NordigenApi;
use crate::error::ApiError;
use crate::models::RequisitionResponse;
use log::{debug, info};
use serde::Deserialize;

/// Requisition status the provider reports once the end user agreement has
/// lapsed.
pub const STATUS_EXPIRED: &str = "EX";

/// The accounts linked through one requisition.
#[derive(Debug)]
pub struct AccountManager<'a, C> {
    requisition_id: String,
    institution_id: Option<String>,
    reference: Option<String>,
    status: Option<String>,
    accounts: Vec<Account<'a, C>>,
}

impl<'a, C: NordigenApi> AccountManager<'a, C> {
    /// Resolve `requisition_id` into its linked accounts, in the order the
    /// provider lists them.
    ///
    /// Fails with status 428 when the requisition has expired and 410 when it
    /// links no accounts. Construction is all or nothing: if any account fails
    /// to build, the error is returned and no accounts are exposed.
    pub async fn new(
        client: &'a C,
        requisition_id: impl Into<String>,
        fetch_data_for_accounts: bool,
    ) -> Result<Self, ApiError> {
        let requisition_id = requisition_id.into();
        let body = client
            .requisition(&requisition_id)
            .await
            .map_err(|err| ApiError::from_provider("Error fetching requisition details", err))?;
        let requisition = RequisitionResponse::deserialize(&body).map_err(|err| {
            ApiError::unknown(format!(
                "Unexpected error during requisition initialization: {err}"
            ))
        })?;

        if requisition.status.as_deref() == Some(STATUS_EXPIRED) {
            info!("Requisition {} has expired", requisition_id);
            return Err(ApiError::requisition_expired(body));
        }

        let account_ids = match requisition.accounts {
            Some(ids) if !ids.is_empty() => ids,
            _ => return Err(ApiError::no_linked_accounts(body)),
        };

        debug!(
            "Requisition {} links {} accounts",
            requisition_id,
            account_ids.len()
        );
        let mut accounts = Vec::with_capacity(account_ids.len());
        for account_id in account_ids {
            accounts.push(Account::new(client, account_id, fetch_data_for_accounts).await?);
        }

        Ok(Self {
            requisition_id,
            institution_id: requisition.institution_id,
            reference: requisition.reference,
            status: requisition.status,
            accounts,
        })
    }

    pub fn requisition_id(&self) -> &str {
        &self.requisition_id
    }

    pub fn institution_id(&self) -> Option<&str> {
        self.institution_id.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Requisition status as reported at construction (e.g. "LN" once linked).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn accounts(&self) -> &[Account<'a, C>] {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut [Account<'a, C>] {
        &mut self.accounts
    }

    pub fn into_accounts(self) -> Vec<Account<'a, C>> {
        self.accounts
    }

    /// Refresh every account in order, stopping at the first failure.
    pub async fn refresh_accounts(&mut self) -> Result<(), ApiError> {
        for account in &mut self.accounts {
            account.refresh().await?;
        }
        Ok(())
    }
}
