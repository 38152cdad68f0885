//! Payload deserialization for tailoring frames.

use serde::Deserialize;

/// Payload for `meta` frames.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetaPayload {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub recommended_appliances: Option<Vec<String>>,
}

/// Payload for `status` frames.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusPayload {
    pub message: String,
}

/// Payload for `error` frames.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}
