//! Unified error type for the kitchen hub client.

use thiserror::Error;

use super::category::ErrorCategory;
use super::config::ConfigError;
use super::tailor::TailorError;
use super::transport::TransportError;
use super::validation::UpdateRejected;

/// Unified error type returned by the client, actions and controllers.
#[derive(Debug, Error)]
pub enum KitchenError {
    /// Request or response-body failures, including cancellation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A REST response body did not match the expected shape.
    #[error("invalid response payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A snapshot update was refused by the cache.
    #[error(transparent)]
    Rejected(#[from] UpdateRejected),

    /// A tailoring controller operation was refused.
    #[error(transparent)]
    Tailor(#[from] TailorError),

    /// The client configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KitchenError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            KitchenError::Transport(TransportError::Cancelled) => ErrorCategory::Cancelled,
            KitchenError::Transport(TransportError::Status { status, .. })
            | KitchenError::Transport(TransportError::MissingBody { status, .. }) => {
                if *status >= 500 {
                    ErrorCategory::Server
                } else {
                    ErrorCategory::Client
                }
            }
            KitchenError::Transport(TransportError::InvalidUrl(_)) => ErrorCategory::Configuration,
            KitchenError::Transport(_) => ErrorCategory::Network,
            KitchenError::Payload(_) => ErrorCategory::Server,
            KitchenError::Rejected(_) => ErrorCategory::Validation,
            KitchenError::Tailor(_) => ErrorCategory::Client,
            KitchenError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Check if this error may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            KitchenError::Transport(err) => err.is_retryable(),
            other => other.category().is_retryable(),
        }
    }

    /// True when the error is a cancellation and must not be reported.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, KitchenError::Transport(TransportError::Cancelled))
    }

    /// Message suitable for showing to the user, or `None` when the error
    /// belongs to a category that is filtered out of user-facing paths.
    pub fn user_message(&self) -> Option<String> {
        if !self.category().is_user_visible() {
            return None;
        }
        let message = match self {
            KitchenError::Transport(TransportError::Status { message, .. })
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            KitchenError::Transport(_) => {
                "We couldn't reach the kitchen hub. Please try again.".to_string()
            }
            KitchenError::Payload(_) => {
                "The kitchen hub sent an unexpected response.".to_string()
            }
            other => other.to_string(),
        };
        Some(message)
    }
}
