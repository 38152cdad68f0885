//! Error category classification for unified error handling.
//!
//! Categories drive two decisions made by callers: whether an operation may
//! be retried, and whether a failure should be shown to the user at all.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS or timeout failures.
    /// Generally transient and retryable.
    Network,

    /// Backend errors (HTTP 5xx, structured stream errors).
    Server,

    /// Requests the backend rejected as invalid (HTTP 4xx) or misuse of a
    /// client component (e.g. starting a run while one is streaming).
    Client,

    /// The operation was cancelled by its owner. Never user-visible.
    Cancelled,

    /// Internal consistency guards (stale snapshot updates). Never user-visible.
    Validation,

    /// Invalid configuration values.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns true if errors in this category should reach the user.
    ///
    /// Cancellation and validation failures are filtered out of every
    /// error-reporting path.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ErrorCategory::Cancelled | ErrorCategory::Validation)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check your connection to the kitchen hub and try again",
            ErrorCategory::Server => "The kitchen hub may be busy. Please try again shortly",
            ErrorCategory::Client => "Check the request and try again",
            ErrorCategory::Cancelled => "",
            ErrorCategory::Validation => "",
            ErrorCategory::Configuration => "Check the KITCHENHUB_* environment variables",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
