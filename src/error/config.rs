//! Configuration errors.

use std::time::Duration;

use thiserror::Error;

/// Invalid client configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A poll interval lies outside the allowed bounds.
    #[error("{name} interval {actual:?} is outside {min:?}..={max:?}")]
    IntervalOutOfBounds {
        name: &'static str,
        actual: Duration,
        min: Duration,
        max: Duration,
    },

    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}
