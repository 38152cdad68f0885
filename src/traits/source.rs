//! Snapshot source abstraction used by the status poller.

use async_trait::async_trait;

use crate::client::KitchenClient;
use crate::error::KitchenResult;
use crate::models::Appliance;

/// Fetches the current snapshot of one appliance.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_one(&self, id: &str) -> KitchenResult<Appliance>;
}

#[async_trait]
impl SnapshotSource for KitchenClient {
    async fn fetch_one(&self, id: &str) -> KitchenResult<Appliance> {
        self.get_appliance(id).await
    }
}
