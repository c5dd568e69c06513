use crate::client::NordigenApi;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Scripted = Result<Value, ProviderError>;

/// In-memory provider that replays scripted responses per endpoint and
/// records every call it receives.
#[derive(Debug, Default)]
pub struct FakeApi {
    token: Option<String>,
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `endpoint`, e.g. `"details/acc1"`.
    pub fn respond(self, endpoint: &str, response: Scripted) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn next(&self, endpoint: String) -> Scripted {
        self.calls.lock().unwrap().push(endpoint.clone());
        self.responses
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("unexpected call to {endpoint}"))
    }
}

#[async_trait]
impl NordigenApi for FakeApi {
    async fn generate_token(&self) -> Result<Value, ProviderError> {
        self.next("token/new".to_string())
    }

    async fn exchange_token(&self, refresh_token: &str) -> Result<Value, ProviderError> {
        self.next(format!("token/refresh/{refresh_token}"))
    }

    async fn account_details(&self, account_id: &str) -> Result<Value, ProviderError> {
        self.next(format!("details/{account_id}"))
    }

    async fn account_balances(&self, account_id: &str) -> Result<Value, ProviderError> {
        self.next(format!("balances/{account_id}"))
    }

    async fn requisition(&self, requisition_id: &str) -> Result<Value, ProviderError> {
        self.next(format!("requisition/{requisition_id}"))
    }

    fn set_token(&mut self, access_token: String) {
        self.token = Some(access_token);
    }
}

/// A rejected request shaped like the provider's JSON error bodies.
pub fn rejected(status: u16, summary: &str) -> ProviderError {
    ProviderError::Status {
        status: StatusCode::from_u16(status).unwrap(),
        body: json!({ "summary": summary, "detail": summary, "status_code": status }),
    }
}

/// A success body that is not JSON.
pub fn undecodable() -> ProviderError {
    ProviderError::InvalidResponse(serde_json::from_str::<Value>("<html>").unwrap_err())
}
