//! Token acquisition: turn credentials (and optionally a stored refresh
//! token) into an authenticated client.

use crate::client::{Client, NordigenApi};
use crate::error::ApiError;
use crate::models::TokenResponse;
use log::{debug, info};
use serde_json::Value;

const STATUS_UNAUTHORIZED: u16 = 401;

/// Build a [`Client`] for the given credentials and authenticate it.
///
/// Returns the client with its access token set, plus a newly issued refresh
/// token when one was generated. The caller is responsible for persisting it.
///
/// To target another host (a proxy or a local test server), build the client
/// with `Client::new(..)?.with_base_url(..)` and pass it to [`authenticate`].
pub async fn obtain_client(
    secret_id: &str,
    secret_key: &str,
    refresh_token: Option<&str>,
) -> Result<(Client, Option<String>), ApiError> {
    let client = Client::new(secret_id, secret_key)
        .map_err(|err| ApiError::from_provider("Error obtaining access token", err))?;
    authenticate(client, refresh_token).await
}

/// Authenticate any provider client.
///
/// Without a refresh token a fresh token pair is generated and its refresh
/// token returned. With one, it is exchanged for an access token and no new
/// refresh token is returned, unless the provider rejects it with 401, in
/// which case a fresh pair is generated instead.
pub async fn authenticate<C: NordigenApi>(
    mut client: C,
    refresh_token: Option<&str>,
) -> Result<(C, Option<String>), ApiError> {
    let (access, new_refresh) = match refresh_token.filter(|token| !token.is_empty()) {
        None => generate_pair(&client).await?,
        Some(token) => match client.exchange_token(token).await {
            Ok(body) => (access_field(parse_token(body)?)?, None),
            Err(err) if err.status_code() == Some(STATUS_UNAUTHORIZED) => {
                info!("Refresh token rejected as expired, requesting a new token pair");
                generate_pair(&client).await?
            }
            Err(err) => return Err(ApiError::from_provider("Error exchanging token", err)),
        },
    };

    client.set_token(access);
    debug!(
        "Client authenticated (new refresh token issued: {})",
        new_refresh.is_some()
    );
    Ok((client, new_refresh))
}

async fn generate_pair<C: NordigenApi>(client: &C) -> Result<(String, Option<String>), ApiError> {
    let body = client
        .generate_token()
        .await
        .map_err(|err| ApiError::from_provider("Error generating token", err))?;
    let mut token = parse_token(body)?;
    let refresh = token.refresh.take().ok_or_else(|| missing_key("refresh"))?;
    Ok((access_field(token)?, Some(refresh)))
}

fn parse_token(body: Value) -> Result<TokenResponse, ApiError> {
    serde_json::from_value(body)
        .map_err(|err| ApiError::malformed(format!("Invalid token response: {err}")))
}

fn access_field(token: TokenResponse) -> Result<String, ApiError> {
    token.access.ok_or_else(|| missing_key("access"))
}

fn missing_key(key: &str) -> ApiError {
    ApiError::malformed(format!("Missing expected key in token response: '{key}'"))
}
