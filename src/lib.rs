//! kitchenhub - client for the kitchen hub appliance and recipe API
//!
//! - `transport` - cancellable SSE frame streams over an [`traits::HttpClient`]
//! - `poller` - status polling for appliances whose manuals are processing
//! - `tailoring` - the recipe tailoring stream controller
//! - `cache` - shared query cache with monotonic merges and optimistic writes
//! - `actions` - appliance create/retry/delete on top of the cache
//!
//! This library exposes modules for use in integration tests and the CLI.

pub mod actions;
pub mod adapters;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod poller;
pub mod sse;
pub mod tailoring;
pub mod traits;
pub mod transport;

pub use actions::ApplianceActions;
pub use cache::QueryCache;
pub use client::KitchenClient;
pub use config::ClientConfig;
pub use error::{KitchenError, KitchenResult};
pub use poller::{ObservationHandle, StatusPoller};
pub use tailoring::TailoringController;
