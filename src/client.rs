use crate::error::ProviderError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

const BASE_URL: &str = "https://bankaccountdata.gocardless.com/api/v2";

/// The provider operations the account layer consumes.
///
/// Bodies are handed back as loosely typed JSON; callers pick out the fields
/// they need and apply their own defaults.
#[async_trait]
pub trait NordigenApi: Send + Sync {
    /// Request a brand-new access/refresh token pair.
    async fn generate_token(&self) -> Result<Value, ProviderError>;

    /// Exchange a refresh token for a new access token.
    async fn exchange_token(&self, refresh_token: &str) -> Result<Value, ProviderError>;

    async fn account_details(&self, account_id: &str) -> Result<Value, ProviderError>;

    async fn account_balances(&self, account_id: &str) -> Result<Value, ProviderError>;

    async fn requisition(&self, requisition_id: &str) -> Result<Value, ProviderError>;

    /// Bearer token used by every subsequent call.
    fn set_token(&mut self, access_token: String);
}

#[derive(Clone)]
pub struct Client {
    secret_id: String,
    secret_key: String,
    token: Option<String>,
    http: HttpClient,
    base_url: String,
}

impl Client {
    /// Create an unauthenticated client with the default base URL.
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        info!("Initialized Nordigen API client with default base URL");
        Ok(Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            token: None,
            http,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Override the base URL (useful for tests or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Updated Nordigen API base URL to {}", self.base_url);
        self
    }

    /// Access token currently attached to requests, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: String) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET request to {}{}", self.base_url, path);
        self.send(self.http.get(url), &path).await
    }

    async fn post(&self, path: &str, payload: Value) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST request to {}{}", self.base_url, path);
        self.send(self.http.post(url).json(&payload), path).await
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Value, ProviderError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        debug!("Received status {} for {}", status, path);

        let text = response.text().await?;
        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(ProviderError::Status { status, body });
        }
        serde_json::from_str(&text).map_err(ProviderError::InvalidResponse)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl NordigenApi for Client {
    async fn generate_token(&self) -> Result<Value, ProviderError> {
        debug!("Requesting new token pair");
        let payload = json!({
            "secret_id": self.secret_id,
            "secret_key": self.secret_key,
        });
        self.post("/token/new/", payload).await
    }

    async fn exchange_token(&self, refresh_token: &str) -> Result<Value, ProviderError> {
        debug!("Exchanging refresh token for access token");
        self.post("/token/refresh/", json!({ "refresh": refresh_token })).await
    }

    async fn account_details(&self, account_id: &str) -> Result<Value, ProviderError> {
        self.get(format!("/accounts/{}/details/", account_id)).await
    }

    async fn account_balances(&self, account_id: &str) -> Result<Value, ProviderError> {
        self.get(format!("/accounts/{}/balances/", account_id)).await
    }

    async fn requisition(&self, requisition_id: &str) -> Result<Value, ProviderError> {
        self.get(format!("/requisitions/{}/", requisition_id)).await
    }

    fn set_token(&mut self, access_token: String) {
        self.token = Some(access_token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticate;
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answers one connection per scripted `(status, body)` and returns the raw
    /// requests it saw.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api/v2", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);
                let reason = StatusCode::from_u16(status)
                    .unwrap()
                    .canonical_reason()
                    .unwrap_or("");
                let head =
                    format!("HTTP/1.1 {status} {reason}\r\ncontent-length: {}\r\n", body.len());
                let response = format!("{head}connection: close\r\n\r\n{body}");
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            requests
        });
        (base_url, handle)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn local_client(base_url: String) -> Client {
        Client::new("id", "key")
            .expect("client should build")
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn expired_refresh_token_falls_back_over_http() {
        let (base_url, server) = serve(vec![
            (401, r#"{"summary":"Invalid token","status_code":401}"#),
            (200, r#"{"access":"a9","access_expires":86400,"refresh":"r9"}"#),
        ])
        .await;
        let (client, refresh) = authenticate(local_client(base_url), Some("old"))
            .await
            .expect("auth should succeed");
        assert_eq!(client.token(), Some("a9"));
        assert_eq!(refresh.as_deref(), Some("r9"));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /api/v2/token/refresh/ HTTP/1.1"));
        assert!(requests[0].contains(r#"{"refresh":"old"}"#));
        assert!(!requests[0].to_lowercase().contains("authorization:"));
        assert!(requests[1].starts_with("POST /api/v2/token/new/ HTTP/1.1"));
        assert!(requests[1].contains(r#""secret_id":"id""#));
        assert!(requests[1].contains(r#""secret_key":"key""#));
    }

    #[tokio::test]
    async fn rejected_request_keeps_json_body_and_status() {
        let (base_url, _server) =
            serve(vec![(401, r#"{"summary":"Invalid token","status_code":401}"#)]).await;
        let err = local_client(base_url).requisition("req1").await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(
            err.response_body().and_then(|b| b.get("summary")),
            Some(&json!("Invalid token"))
        );
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_as_string() {
        let (base_url, _server) = serve(vec![(502, "<html>bad gateway</html>")]).await;
        let err = local_client(base_url).account_details("acc1").await.unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, Value::String("<html>bad gateway</html>".to_string()));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_success_body_is_invalid_response() {
        let (base_url, _server) = serve(vec![(200, "not json")]).await;
        let err = local_client(base_url).account_balances("acc1").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn requests_use_endpoint_paths_and_bearer_token() {
        let (base_url, server) = serve(vec![
            (200, r#"{"id":"req1","accounts":["acc1"]}"#),
            (200, r#"{"account":{"name":"Main"}}"#),
            (200, r#"{"balances":[]}"#),
        ])
        .await;
        let mut client = local_client(base_url);
        client.set_token("a1".to_string());

        let requisition = client.requisition("req1").await.expect("requisition");
        assert_eq!(requisition["accounts"], json!(["acc1"]));
        client.account_details("acc1").await.expect("details");
        client.account_balances("acc1").await.expect("balances");

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /api/v2/requisitions/req1/ HTTP/1.1"));
        assert!(requests[1].starts_with("GET /api/v2/accounts/acc1/details/ HTTP/1.1"));
        assert!(requests[2].starts_with("GET /api/v2/accounts/acc1/balances/ HTTP/1.1"));
        for request in &requests {
            assert!(request.to_lowercase().contains("authorization: bearer a1"));
        }
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let client = Client::new("id", "key")
            .expect("client should build")
            .with_base_url("http://localhost:8080/api/v2/");
        assert_eq!(client.base_url(), "http://localhost:8080/api/v2");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut client = Client::new("my-id", "super-secret").expect("client should build");
        client.set_token("access-123".to_string());
        let rendered = format!("{client:?}");
        assert!(rendered.contains("my-id"));
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("access-123"));
        assert_eq!(client.token(), Some("access-123"));
    }
}
