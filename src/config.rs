//! Client configuration.
//!
//! Built with the builder methods or read from the environment:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `KITCHENHUB_API_URL` | API base URL | `http://localhost:8787` |
//! | `KITCHENHUB_POLL_QUEUED_MS` | Poll interval while queued | 1600 |
//! | `KITCHENHUB_POLL_PROCESSING_MS` | Poll interval while processing | 1000 |
//! | `KITCHENHUB_LOG` | Default log filter | `info` |

use std::time::Duration;

use crate::error::ConfigError;
use crate::models::ApplianceStatus;

/// Default API base URL for a locally running backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8787";

/// Poll intervals must stay within these bounds.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Per-state poll intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub queued: Duration,
    pub processing: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            queued: Duration::from_millis(1600),
            processing: Duration::from_millis(1000),
        }
    }
}

impl PollIntervals {
    /// Check both intervals against [`MIN_POLL_INTERVAL`]..=[`MAX_POLL_INTERVAL`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_interval("queued", self.queued)?;
        check_interval("processing", self.processing)
    }

    /// Interval to wait in `status`, or `None` for terminal states.
    pub fn for_status(&self, status: ApplianceStatus) -> Option<Duration> {
        match status {
            ApplianceStatus::Queued => Some(self.queued),
            ApplianceStatus::Processing => Some(self.processing),
            ApplianceStatus::Ready | ApplianceStatus::Error => None,
        }
    }
}

/// Configuration for [`crate::client::KitchenClient`] and the status poller.
///
/// # Example
///
/// ```ignore
/// use kitchenhub::config::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_base_url("http://localhost:8787")
///     .with_processing_interval(Duration::from_millis(1200));
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL without a trailing slash
    pub base_url: String,
    /// Poll intervals by lifecycle state
    pub poll_intervals: PollIntervals,
    /// Timeout for plain (non-streaming) requests
    pub request_timeout: Duration,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_intervals: PollIntervals::default(),
            request_timeout: Duration::from_secs(15),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_queued_interval(mut self, interval: Duration) -> Self {
        self.poll_intervals.queued = interval;
        self
    }

    pub fn with_processing_interval(mut self, interval: Duration) -> Self {
        self.poll_intervals.processing = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build a config from `KITCHENHUB_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparseable ones are an
    /// error. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("KITCHENHUB_API_URL") {
            config = config.with_base_url(url);
        }
        if let Some(ms) = read_millis("KITCHENHUB_POLL_QUEUED_MS")? {
            config = config.with_queued_interval(ms);
        }
        if let Some(ms) = read_millis("KITCHENHUB_POLL_PROCESSING_MS")? {
            config = config.with_processing_interval(ms);
        }
        if let Ok(level) = std::env::var("KITCHENHUB_LOG") {
            config = config.with_log_level(level);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the URL scheme and that both poll intervals lie within
    /// [`MIN_POLL_INTERVAL`]..=[`MAX_POLL_INTERVAL`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        self.poll_intervals.validate()
    }
}

fn check_interval(name: &'static str, actual: Duration) -> Result<(), ConfigError> {
    if actual < MIN_POLL_INTERVAL || actual > MAX_POLL_INTERVAL {
        return Err(ConfigError::IntervalOutOfBounds {
            name,
            actual,
            min: MIN_POLL_INTERVAL,
            max: MAX_POLL_INTERVAL,
        });
    }
    Ok(())
}

fn read_millis(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}
