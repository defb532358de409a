//! Device registry client errors

use thiserror::Error;

/// Errors from the device registry API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceClientError {
    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call exceeded its timeout
    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Record does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}

impl DeviceClientError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::NotFound { .. } => false,
        }
    }
}

impl From<reqwest::Error> for DeviceClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
