//! Error types for the Provisor client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the management API or the gateway
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request could not be sent or its body read
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned a non-success status, either non-transient or after
    /// transient retries ran out
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A named resource is absent from a listing
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway answered the probe with a non-401 error status
    #[error("Gateway rejected probe (status {status}): {message}")]
    ProbeRejected { status: u16, message: String },

    /// Gateway kept answering 401 until the probe gave up
    #[error("Gateway still unauthorized after {attempts} attempt(s)")]
    ProbeExhausted { attempts: u32 },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }
}
