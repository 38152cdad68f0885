//! Trait abstractions for dependency injection and testability.
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, DELETE, streaming POST)
//! - [`SnapshotSource`] - single-appliance fetch used by the status poller

pub mod http;
pub mod source;

pub use http::{ByteStream, Headers, HttpClient, Response};
pub use source::SnapshotSource;
