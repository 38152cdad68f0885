//! Tailoring controller errors.

use thiserror::Error;

/// Errors returned by the tailoring stream controller's public operations.
///
/// Failures *inside* a running stream never surface here; they move the run
/// into its `error` state instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TailorError {
    /// `start` was called while a run is already streaming.
    #[error("a tailoring run is already streaming for {key}")]
    AlreadyStreaming { key: String },

    /// `start` was called with no appliances selected.
    #[error("select at least one appliance before tailoring")]
    NoAppliances,
}
