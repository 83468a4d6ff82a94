//! Request error type for retry classification.

use thiserror::Error;

/// Error returned by a single platform request.
/// Kept typed so the retry loop can classify it before it is turned into `anyhow`.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// The platform answered with a status other than the one the call expects.
    #[error("HTTP {status}: {body}")]
    Status { status: u32, body: String },
    /// Request body could not be encoded or the response body could not be decoded.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl RequestError {
    /// Response text for status errors, otherwise the error message itself.
    pub fn message(&self) -> String {
        match self {
            RequestError::Status { body, .. } if !body.is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}
