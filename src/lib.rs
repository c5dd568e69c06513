//! Account helpers for the GoCardless Bank Account Data (Nordigen) API.
//! Authenticates a client, resolves a requisition into its linked accounts
//! and fetches account details and balances.

pub mod account;
pub mod auth;
pub mod client;
pub mod error;
pub mod manager;
pub mod models;

#[cfg(test)]
mod testutils;

pub use account::Account;
pub use auth::{authenticate, obtain_client};
pub use client::{Client, NordigenApi};
pub use error::{ApiError, ErrorKind, ProviderError};
pub use manager::AccountManager;
pub use models::Balance;
