//! Status polling for appliances whose manuals are being processed.
//!
//! - `reducer` - pure `(state, event) -> (state, effects)` transition function
//! - `observer` - tasks that run the reducer against timers and fetches

mod observer;
mod reducer;

pub use observer::{ObservationHandle, StatusPoller};
pub use reducer::{reduce, PollEffect, PollEvent, PollNotification, PollState};
