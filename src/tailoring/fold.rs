//! Folding parsed frames into a run.

use chrono::{DateTime, Utc};

use crate::models::{RunStatus, TailoringRun};
use crate::sse::{Frame, TailorFrame};

/// How a tailoring run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Complete,
    /// The run is in `error`. `retryable` tells the caller whether starting
    /// again is likely to help.
    Failed {
        message: String,
        retryable: bool,
    },
    Cancelled,
}

impl RunOutcome {
    /// Outcome matching a run that is already terminal.
    pub(crate) fn of(run: &TailoringRun, retryable: bool) -> Option<Self> {
        match run.status {
            RunStatus::Complete => Some(RunOutcome::Complete),
            RunStatus::Cancelled => Some(RunOutcome::Cancelled),
            RunStatus::Error => Some(RunOutcome::Failed {
                message: run.error_message.clone().unwrap_or_default(),
                retryable,
            }),
            RunStatus::Idle | RunStatus::Streaming => None,
        }
    }
}

/// Result of folding one frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// The run changed.
    Updated,
    /// Nothing to do (duplicate block, run already finished).
    Ignored,
    Status(String),
    Passthrough(Frame),
    Finished(RunOutcome),
}

/// Apply `frame` to `run`.
///
/// A run that is no longer streaming accepts nothing; late frames after a
/// cancel or a terminal frame fall through as [`Step::Ignored`].
pub(crate) fn fold_frame(run: &mut TailoringRun, frame: TailorFrame, now: DateTime<Utc>) -> Step {
    if run.status != RunStatus::Streaming {
        return Step::Ignored;
    }
    match frame {
        TailorFrame::Status { message } => Step::Status(message),
        TailorFrame::Meta {
            summary,
            recommended_appliances,
        } => {
            run.apply_meta(summary, recommended_appliances);
            Step::Updated
        }
        TailorFrame::Block(block) => {
            if run.insert_block(block) {
                Step::Updated
            } else {
                Step::Ignored
            }
        }
        TailorFrame::Error { message, retryable } => {
            run.mark_error(message.clone(), now);
            Step::Finished(RunOutcome::Failed { message, retryable })
        }
        TailorFrame::Complete => {
            run.mark_complete(now);
            Step::Finished(RunOutcome::Complete)
        }
        TailorFrame::Unknown(frame) => Step::Passthrough(frame),
    }
}
