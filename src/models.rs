use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Placeholder for any descriptive field the provider left out.
pub const UNKNOWN: &str = "Unknown";

/// A single normalized balance entry of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub balance_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub reference_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AccountDetailsResponse {
    pub account: Option<RawAccountDetails>,
}

/// Each field falls back to `None` on its own when absent or not a string.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawAccountDetails {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BalancesResponse {
    pub balances: Option<Vec<RawBalance>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBalance {
    #[serde(rename = "balanceType")]
    balance_type: Option<String>,
    #[serde(rename = "balanceAmount")]
    balance_amount: Option<RawAmount>,
    #[serde(rename = "referenceDate")]
    reference_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAmount {
    amount: Option<Decimal>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RequisitionResponse {
    pub institution_id: Option<String>,
    pub reference: Option<String>,
    pub status: Option<String>,
    pub accounts: Option<Vec<String>>,
}

impl From<RawBalance> for Balance {
    fn from(raw: RawBalance) -> Self {
        let (amount, currency) = match raw.balance_amount {
            Some(RawAmount { amount, currency }) => (amount, currency),
            None => (None, None),
        };
        Balance {
            balance_type: or_unknown(raw.balance_type),
            amount: amount.unwrap_or(Decimal::ZERO),
            currency: or_unknown(currency),
            reference_date: raw.reference_date.as_deref().and_then(parse_date),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_str().map(str::to_owned)))
}

pub(crate) fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.get(0..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
