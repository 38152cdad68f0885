//! SSE frame types.
//!
//! A [`Frame`] is one raw SSE record. [`TailorFrame`] is the typed view the
//! tailoring controller folds into run state; each variant is validated on
//! its own so a bad payload in one frame never poisons the others.

use thiserror::Error;

use crate::models::InstructionBlock;

/// Event name used when a record carries no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: block")
    Event(String),
    /// Data payload chunk
    Data(String),
    /// Empty line - signals end of record
    Empty,
    /// Comment line (starts with ':') or a field this client does not use
    Comment(String),
}

/// One SSE record: the event name and its data lines joined with `\n`.
///
/// No JSON parsing happens at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Typed tailoring frames.
#[derive(Debug, Clone, PartialEq)]
pub enum TailorFrame {
    /// Live progress narration. Not part of the durable run.
    Status { message: String },
    /// Summary and recommended appliances for the run.
    Meta {
        summary: Option<String>,
        recommended_appliances: Option<Vec<String>>,
    },
    /// One instruction block.
    Block(InstructionBlock),
    /// Structured failure reported by the backend.
    Error { message: String, retryable: bool },
    /// The run finished successfully.
    Complete,
    /// An event name this client does not handle, passed through untouched.
    Unknown(Frame),
}

impl TailorFrame {
    pub fn event_type_name(&self) -> &str {
        match self {
            TailorFrame::Status { .. } => "status",
            TailorFrame::Meta { .. } => "meta",
            TailorFrame::Block(_) => "block",
            TailorFrame::Error { .. } => "error",
            TailorFrame::Complete => "complete",
            TailorFrame::Unknown(frame) => &frame.event,
        }
    }
}

/// A frame payload that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameParseError {
    /// Invalid JSON in data payload
    #[error("invalid JSON for event '{event_type}': {reason}")]
    InvalidJson { event_type: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_name() {
        assert_eq!(
            TailorFrame::Status {
                message: String::new()
            }
            .event_type_name(),
            "status"
        );
        assert_eq!(TailorFrame::Complete.event_type_name(), "complete");
        assert_eq!(
            TailorFrame::Unknown(Frame::new("heartbeat", "")).event_type_name(),
            "heartbeat"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = FrameParseError::InvalidJson {
            event_type: "block".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid JSON for event 'block': expected value"
        );
    }
}
