//! Transport-level errors.
//!
//! Raised by the HTTP adapters and the SSE frame stream. Cancellation is a
//! dedicated variant so consumers can tell a user-initiated abort apart from
//! a broken connection.

use thiserror::Error;

/// Errors raised while issuing a request or reading its response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("request to {url} failed with status {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The server answered successfully but sent no body to stream.
    #[error("response from {url} (status {status}) had no body")]
    MissingBody { url: String, status: u16 },

    /// Connecting to the server failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request or a body read timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection dropped while the body was being read.
    #[error("network error: {0}")]
    Network(String),

    /// The URL could not be built or parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The operation was cancelled through its cancellation token.
    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// True when this error came from an explicit cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } | TransportError::MissingBody { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Connection-level failures and 5xx responses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed(_)
            | TransportError::Timeout(_)
            | TransportError::Network(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
