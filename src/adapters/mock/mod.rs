//! Mock implementations for testing.
//!
//! Enables unit testing of the client, poller and tailoring controller
//! without a network.

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
