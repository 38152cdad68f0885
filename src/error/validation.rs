//! Mutation-boundary validation errors.
//!
//! These guard internal consistency of the cache. They are logged at debug
//! level and dropped; they never reach the user.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::ApplianceStatus;

/// Reasons a snapshot update was refused by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateRejected {
    /// The incoming snapshot is older than the cached one.
    #[error("stale update for {id}: incoming {incoming} is older than cached {current}")]
    Stale {
        id: String,
        incoming: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    /// The incoming snapshot would move the lifecycle backwards.
    #[error("illegal transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: String,
        from: ApplianceStatus,
        to: ApplianceStatus,
    },

    /// The incoming snapshot lowers progress within the same non-terminal state.
    #[error("progress regression for {id}: {current}% -> {incoming}%")]
    ProgressRegression {
        id: String,
        current: u8,
        incoming: u8,
    },

    /// The key already holds a different kind of value.
    #[error("cache entry {key} holds a different kind of value")]
    KindMismatch { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_transition() {
        let err = UpdateRejected::IllegalTransition {
            id: "appliance-001".to_string(),
            from: ApplianceStatus::Ready,
            to: ApplianceStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "illegal transition for appliance-001: ready -> processing"
        );
    }

    #[test]
    fn test_display_progress() {
        let err = UpdateRejected::ProgressRegression {
            id: "a".to_string(),
            current: 62,
            incoming: 24,
        };
        assert_eq!(err.to_string(), "progress regression for a: 62% -> 24%");
    }
}
