use reqwest::{Response, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::auth::StoreError;

/// Fallback message when a failed response carries nothing usable
const GENERIC_FAILURE: &str = "Request failed";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Final response was not 2xx. `message` comes from [`extract_message`].
    #[error("{message}")]
    Request { status: StatusCode, message: String },

    #[error("Session expired. Please log in again.")]
    SessionExpired,

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Maximum length for raw response bodies echoed in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// HTTP status of a failed response, if that is what this error is
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Build a request error by reading the failed response's body
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        ApiError::Request {
            status,
            message: extract_message(response).await,
        }
    }
}

/// Truncate a response body to avoid echoing excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Turn a failed response into a displayable message. Never fails.
pub async fn extract_message(response: Response) -> String {
    let status = response.status();
    match response.bytes().await {
        Ok(body) => message_from_body(status, &body),
        Err(_) => status_phrase(status),
    }
}

/// The `detail` field of a JSON body, else the JSON itself as text, else the
/// status phrase.
pub fn message_from_body(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(data) => match data.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(detail) if is_truthy(detail) => truncate_body(&detail.to_string()),
            _ => truncate_body(&data.to_string()),
        },
        Err(_) => status_phrase(status),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn status_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or(GENERIC_FAILURE)
        .to_string()
}
