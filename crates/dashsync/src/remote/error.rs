//! Remote dashboard store error types.

use thiserror::Error;

/// Errors returned by a dashboard store.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network, TLS or authentication failure reaching the store.
    #[error("Dashboard store unavailable: {0}")]
    Unavailable(String),

    /// 404-class response.
    #[error("{0} not found (404)")]
    NotFound(String),

    /// Any other non-success response.
    #[error("Dashboard store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request could not be built from the given content.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The store answered with a body we could not decode.
    #[error("Unexpected response from dashboard store: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether the error means the store itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse(err.to_string())
        } else {
            RemoteError::Unavailable(err.to_string())
        }
    }
}

/// Result type for dashboard store operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
