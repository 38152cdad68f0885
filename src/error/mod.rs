//! Error handling for the kitchen hub client.
//!
//! - **Transport errors**: non-2xx responses, dropped connections, cancellation
//! - **Validation errors**: stale or out-of-order snapshot updates refused by the cache
//! - **Tailor errors**: misuse of the tailoring controller (e.g. double start)
//! - **Config errors**: invalid intervals or URLs
//! - **Unified error type**: `KitchenError` with categories for retry and reporting decisions
//!
//! Frame payload parse failures live with the SSE types
//! ([`crate::sse::FrameParseError`]); they are always recovered locally and
//! never become a `KitchenError`.
//!
//! | Category | Retryable | User visible |
//! |----------|-----------|--------------|
//! | Network | Yes | Yes |
//! | Server | Yes | Yes |
//! | Client | No | Yes |
//! | Cancelled | No | No |
//! | Validation | No | No |
//! | Configuration | No | Yes |

mod category;
mod config;
mod kitchen_error;
mod tailor;
mod transport;
mod validation;

pub use category::ErrorCategory;
pub use config::ConfigError;
pub use kitchen_error::KitchenError;
pub use tailor::TailorError;
pub use transport::TransportError;
pub use validation::UpdateRejected;

/// Result alias used across the crate.
pub type KitchenResult<T> = Result<T, KitchenError>;
