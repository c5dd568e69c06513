use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Status reported when the requisition's end user agreement has expired.
pub const STATUS_REQUISITION_EXPIRED: u16 = 428;
/// Status reported when a requisition has no linked accounts.
pub const STATUS_NO_LINKED_ACCOUNTS: u16 = 410;

/// Failures raised by a provider client implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: Value,
    },

    #[error("invalid or unexpected response format: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

impl ProviderError {
    /// Status code of a rejected request.
    ///
    /// The provider repeats the status as `status_code` in its JSON error
    /// bodies; that value wins over the HTTP status line when present.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, body } => body
                .get("status_code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .or(Some(status.as_u16())),
            _ => None,
        }
    }

    pub fn response_body(&self) -> Option<&Value> {
        match self {
            ProviderError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The provider answered with a non-success status.
    Remote,
    /// A successful response lacked an expected field.
    MalformedResponse,
    /// The requisition has expired (428).
    RequisitionExpired,
    /// The requisition links no accounts (410).
    NoLinkedAccounts,
    /// Transport failures and anything else unexpected.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self {
            ErrorKind::Remote => "remote error",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::RequisitionExpired => "requisition expired",
            ErrorKind::NoLinkedAccounts => "no linked accounts",
            ErrorKind::Unknown => "unknown error",
        };
        f.write_str(v)
    }
}

/// The single error surfaced by every account-layer operation.
///
/// Callers branch on [`ApiError::status_code`] (or [`ApiError::kind`]) to tell
/// an expired requisition (428) or an empty one (410) apart from a generic
/// remote failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    response_body: Option<Value>,
    #[source]
    source: Option<ProviderError>,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn response_body(&self) -> Option<&Value> {
        self.response_body.as_ref()
    }

    /// Wrap a provider failure; `context` prefixes the message.
    ///
    /// Rejected requests become [`ErrorKind::Remote`] with status and body
    /// captured, everything else becomes [`ErrorKind::Unknown`].
    pub(crate) fn from_provider(context: &str, err: ProviderError) -> Self {
        match err.response_body().cloned() {
            Some(body) => Self {
                kind: ErrorKind::Remote,
                message: format!("{context}: {body}"),
                status_code: err.status_code(),
                response_body: Some(body),
                source: Some(err),
            },
            None => Self {
                kind: ErrorKind::Unknown,
                message: format!("Unexpected {}: {err}", lowercase_first(context)),
                status_code: None,
                response_body: None,
                source: Some(err),
            },
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::bare(ErrorKind::MalformedResponse, message.into())
    }

    pub(crate) fn unknown(message: impl Into<String>) -> Self {
        Self::bare(ErrorKind::Unknown, message.into())
    }

    pub(crate) fn requisition_expired(body: Value) -> Self {
        Self {
            kind: ErrorKind::RequisitionExpired,
            message: "Access to accounts has expired as set in End User Agreement. \
                      Connect the accounts again with a new requisition."
                .to_string(),
            status_code: Some(STATUS_REQUISITION_EXPIRED),
            response_body: Some(body),
            source: None,
        }
    }

    pub(crate) fn no_linked_accounts(body: Value) -> Self {
        Self {
            kind: ErrorKind::NoLinkedAccounts,
            message: "No accounts found for the given requisition ID. \
                      Ensure that bank authorization has been completed."
                .to_string(),
            status_code: Some(STATUS_NO_LINKED_ACCOUNTS),
            response_body: Some(body),
            source: None,
        }
    }

    fn bare(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            status_code: None,
            response_body: None,
            source: None,
        }
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
