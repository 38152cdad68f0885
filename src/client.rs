//! HTTP client for the kitchen hub API.
//!
//! Wraps an [`HttpClient`] with the endpoint paths and response envelopes of
//! the appliance and tailoring APIs.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::adapters::ReqwestHttpClient;
use crate::config::ClientConfig;
use crate::error::{KitchenResult, TransportError};
use crate::models::{
    Appliance, ApplianceEnvelope, ApplianceListEnvelope, HistoryEnvelope, NewAppliance,
    TailorKey, TailorRequest, TailoringRun,
};
use crate::traits::{Headers, HttpClient};
use crate::transport::{stream_request, CancellationToken, FrameStream};

/// Client for the kitchen hub REST and streaming endpoints.
///
/// Cheap to clone; clones share the underlying HTTP client.
#[derive(Clone)]
pub struct KitchenClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl std::fmt::Debug for KitchenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl KitchenClient {
    /// Create a reqwest-backed client from validated configuration.
    pub fn new(config: &ClientConfig) -> KitchenResult<Self> {
        config.validate()?;
        let http = ReqwestHttpClient::with_timeout(config.request_timeout)?;
        Ok(Self::with_http(config.base_url.clone(), Arc::new(http)))
    }

    /// Create a client over any [`HttpClient`] implementation.
    pub fn with_http(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn appliance_url(&self, id: &str) -> String {
        self.url(&format!(
            "/api/kitchen/appliances/{}",
            urlencoding::encode(id)
        ))
    }

    fn json_headers() -> Headers {
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> KitchenResult<T> {
        let response = self
            .http
            .get(url, &Self::json_headers())
            .await?
            .error_for_status(url)?;
        Ok(response.json()?)
    }

    async fn post_json<T: DeserializeOwned>(&self, url: &str, body: &str) -> KitchenResult<T> {
        let response = self
            .http
            .post(url, body, &Self::json_headers())
            .await?
            .error_for_status(url)?;
        Ok(response.json()?)
    }

    /// `GET /api/kitchen/appliances/{id}`
    pub async fn get_appliance(&self, id: &str) -> KitchenResult<Appliance> {
        let envelope: ApplianceEnvelope = self.get_json(&self.appliance_url(id)).await?;
        Ok(envelope.appliance)
    }

    /// `GET /api/kitchen/appliances`
    pub async fn list_appliances(&self) -> KitchenResult<Vec<Appliance>> {
        let envelope: ApplianceListEnvelope =
            self.get_json(&self.url("/api/kitchen/appliances")).await?;
        Ok(envelope.appliances)
    }

    /// `POST /api/kitchen/appliances/{id}/retry`
    ///
    /// Moves a failed appliance back to `queued`.
    pub async fn retry_appliance(&self, id: &str) -> KitchenResult<Appliance> {
        let url = format!("{}/retry", self.appliance_url(id));
        let envelope: ApplianceEnvelope = self.post_json(&url, "{}").await?;
        Ok(envelope.appliance)
    }

    /// `POST /api/kitchen/appliances`
    pub async fn create_appliance(&self, input: &NewAppliance) -> KitchenResult<Appliance> {
        let body = serde_json::to_string(input)?;
        let envelope: ApplianceEnvelope = self
            .post_json(&self.url("/api/kitchen/appliances"), &body)
            .await?;
        Ok(envelope.appliance)
    }

    /// `DELETE /api/kitchen/appliances/{id}`
    pub async fn delete_appliance(&self, id: &str) -> KitchenResult<()> {
        let url = self.appliance_url(id);
        self.http
            .delete(&url, &Self::json_headers())
            .await?
            .error_for_status(&url)?;
        Ok(())
    }

    /// `POST /api/recipes/{id}/tailor` as an event stream.
    pub async fn tailor_stream(
        &self,
        key: &TailorKey,
        token: CancellationToken,
    ) -> Result<FrameStream, TransportError> {
        let url = self.url(&format!(
            "/api/recipes/{}/tailor",
            urlencoding::encode(key.recipe_id())
        ));
        let body = serde_json::to_string(&TailorRequest {
            appliances: key.appliance_ids(),
        })
        .map_err(|e| TransportError::Network(e.to_string()))?;

        stream_request(self.http.as_ref(), &url, &body, token).await
    }

    /// `GET /api/recipes/{id}/tailor/history?appliances=A,B`
    ///
    /// Returns the stored run for this recipe and appliance selection, if any.
    pub async fn tailor_history(&self, key: &TailorKey) -> KitchenResult<Option<TailoringRun>> {
        let url = self.url(&format!(
            "/api/recipes/{}/tailor/history?appliances={}",
            urlencoding::encode(key.recipe_id()),
            urlencoding::encode(&key.appliances_param())
        ));
        let envelope: HistoryEnvelope = self.get_json(&url).await?;
        Ok(envelope.history)
    }
}
