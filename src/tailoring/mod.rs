//! Tailoring stream controller.
//!
//! Streams a recipe tailored to the selected appliances and folds every
//! frame into the cached [`TailoringRun`](crate::models::TailoringRun):
//! `idle -> streaming -> complete | error | cancelled`.

mod controller;
mod fold;

pub use controller::{TailorUpdate, TailoringController, GENERIC_FAILURE, UNEXPECTED_END};
pub use fold::RunOutcome;

