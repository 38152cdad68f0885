//! Pure state machine behind the status poller.
//!
//! The runtime in `observer.rs` feeds events in and executes the returned
//! effects; nothing here touches timers, the network or the cache.

use std::time::Duration;

use crate::config::PollIntervals;
use crate::models::{Appliance, ApplianceStatus};

/// Raised once when an observed appliance leaves `queued`/`processing` for
/// a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollNotification {
    ManualReady {
        id: String,
        name: String,
    },
    ManualFailed {
        id: String,
        name: String,
        detail: Option<String>,
    },
}

impl PollNotification {
    pub fn id(&self) -> &str {
        match self {
            PollNotification::ManualReady { id, .. } | PollNotification::ManualFailed { id, .. } => id,
        }
    }

    /// Short text suitable for a toast or a log line.
    pub fn message(&self) -> String {
        match self {
            PollNotification::ManualReady { name, .. } => format!("Manual ready: {}", name),
            PollNotification::ManualFailed { name, detail, .. } => match detail {
                Some(detail) => format!("Manual processing failed for {}: {}", name, detail),
                None => format!("Manual processing failed for {}", name),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Appliance currently observed
    pub resource_id: Option<String>,
    /// Last status seen for `resource_id`; the baseline for transition checks
    pub last_status: Option<ApplianceStatus>,
    /// True while more fetches are expected
    pub polling: bool,
    /// True while a fetch is outstanding
    pub in_flight: bool,
    /// Fetch failures since the last success
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Start observing `id`, discarding bookkeeping for any previous id.
    /// `known` is the cached status, if any.
    Observe {
        id: String,
        known: Option<ApplianceStatus>,
    },
    /// The poll interval elapsed.
    Tick,
    /// A fetch finished; carries the cache's snapshot after merging.
    Fetched(Appliance),
    /// A fetch failed.
    FetchFailed,
    /// Stop polling.
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEffect {
    Fetch(String),
    Schedule(Duration),
    Notify(PollNotification),
    Stopped,
}

fn notification_for(previous: Option<ApplianceStatus>, snapshot: &Appliance) -> Option<PollNotification> {
    let from_background = matches!(
        previous,
        Some(ApplianceStatus::Queued) | Some(ApplianceStatus::Processing)
    );
    if !from_background {
        return None;
    }
    match snapshot.status {
        ApplianceStatus::Ready => Some(PollNotification::ManualReady {
            id: snapshot.id.clone(),
            name: snapshot.display_name(),
        }),
        ApplianceStatus::Error => Some(PollNotification::ManualFailed {
            id: snapshot.id.clone(),
            name: snapshot.display_name(),
            detail: snapshot.detail.clone(),
        }),
        _ => None,
    }
}

/// Apply one event.
pub fn reduce(
    mut state: PollState,
    event: PollEvent,
    intervals: &PollIntervals,
) -> (PollState, Vec<PollEffect>) {
    match event {
        PollEvent::Observe { id, known } => {
            let already_terminal = known.map(ApplianceStatus::is_terminal).unwrap_or(false);
            state = PollState {
                resource_id: Some(id.clone()),
                last_status: known,
                polling: !already_terminal,
                in_flight: !already_terminal,
                consecutive_failures: 0,
            };
            if already_terminal {
                (state, vec![PollEffect::Stopped])
            } else {
                (state, vec![PollEffect::Fetch(id)])
            }
        }

        PollEvent::Tick => {
            if !state.polling || state.in_flight {
                return (state, Vec::new());
            }
            match state.resource_id.clone() {
                Some(id) => {
                    state.in_flight = true;
                    (state, vec![PollEffect::Fetch(id)])
                }
                None => (state, Vec::new()),
            }
        }

        PollEvent::Fetched(snapshot) => {
            if !state.polling || state.resource_id.as_deref() != Some(snapshot.id.as_str()) {
                // Late result after stopping, or for an id we no longer observe
                return (state, Vec::new());
            }
            state.in_flight = false;
            state.consecutive_failures = 0;

            let mut effects = Vec::new();
            if state.last_status != Some(snapshot.status) {
                if let Some(notification) = notification_for(state.last_status, &snapshot) {
                    effects.push(PollEffect::Notify(notification));
                }
                state.last_status = Some(snapshot.status);
            }

            match intervals.for_status(snapshot.status) {
                Some(interval) => effects.push(PollEffect::Schedule(interval)),
                None => {
                    state.polling = false;
                    effects.push(PollEffect::Stopped);
                }
            }
            (state, effects)
        }

        PollEvent::FetchFailed => {
            state.in_flight = false;
            state.consecutive_failures += 1;
            if !state.polling {
                return (state, Vec::new());
            }
            let interval = state
                .last_status
                .and_then(|status| intervals.for_status(status))
                .unwrap_or(intervals.queued);
            (state, vec![PollEffect::Schedule(interval)])
        }

        PollEvent::Stop => {
            let was_polling = state.polling;
            state.polling = false;
            state.in_flight = false;
            if was_polling {
                (state, vec![PollEffect::Stopped])
            } else {
                (state, Vec::new())
            }
        }
    }
}
