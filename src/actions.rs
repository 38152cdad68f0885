//! Appliance mutations with optimistic cache updates.
//!
//! Every mutation writes its expected result into the cache before the
//! request goes out and either confirms it with the server's answer or
//! rolls it back when the request fails.

use chrono::Utc;

use crate::cache::{CacheKey, CacheValue, QueryCache};
use crate::client::KitchenClient;
use crate::error::KitchenResult;
use crate::models::{Appliance, NewAppliance};
use crate::poller::StatusPoller;

fn list_of(value: Option<&CacheValue>) -> Option<Vec<Appliance>> {
    value
        .and_then(CacheValue::as_appliance_list)
        .map(<[Appliance]>::to_vec)
}

/// Appliance list operations over a shared cache.
#[derive(Clone)]
pub struct ApplianceActions {
    client: KitchenClient,
    cache: QueryCache,
    poller: Option<StatusPoller>,
}

impl ApplianceActions {
    pub fn new(client: KitchenClient, cache: QueryCache) -> Self {
        Self {
            client,
            cache,
            poller: None,
        }
    }

    /// Stop observations of deleted appliances through `poller`.
    pub fn with_poller(mut self, poller: StatusPoller) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Fetch the appliance list and merge it into the cache.
    pub async fn refresh_list(&self) -> KitchenResult<Vec<Appliance>> {
        let fetched = self.client.list_appliances().await?;
        tracing::debug!("fetched {} appliances", fetched.len());
        Ok(self.cache.merge_list(fetched))
    }

    /// Register an appliance.
    ///
    /// A provisional `temp-` entry is shown at the top of the list while the
    /// request is in flight; the server's appliance then takes its place.
    pub async fn create(&self, input: &NewAppliance) -> KitchenResult<Appliance> {
        let provisional = Appliance::provisional(input, Utc::now());
        let temp_id = provisional.id.clone();
        let list_key = CacheKey::appliances();

        let token = self.cache.begin_optimistic_update(&list_key, |current| {
            let mut list = list_of(current).unwrap_or_default();
            list.insert(0, provisional);
            Some(CacheValue::ApplianceList(list))
        });

        match self.client.create_appliance(input).await {
            Ok(confirmed) => {
                let confirmed = confirmed.normalized();
                tracing::info!("created appliance {} ({})", confirmed.id, temp_id);
                self.cache.replace_provisional(&temp_id, confirmed.clone());
                drop(token);
                Ok(confirmed)
            }
            Err(err) => {
                tracing::warn!("creating appliance failed: {}", err);
                if !self.cache.rollback(token) {
                    // The list was rewritten meanwhile; drop only our row
                    self.cache.update(&list_key, |current| {
                        list_of(current).map(|mut list| {
                            list.retain(|a| a.id != temp_id);
                            CacheValue::ApplianceList(list)
                        })
                    });
                }
                Err(err)
            }
        }
    }

    /// Ask the server to reprocess a failed manual.
    ///
    /// The cached snapshot shows `queued` with no progress until the server
    /// answers.
    pub async fn retry(&self, id: &str) -> KitchenResult<Appliance> {
        let now = Utc::now();
        let detail_key = CacheKey::appliance(id);
        let list_key = CacheKey::appliances();

        let detail_token = self.cache.begin_optimistic_update(&detail_key, |current| {
            current
                .and_then(CacheValue::as_appliance)
                .map(|a| CacheValue::Appliance(a.requeued(now)))
        });
        let list_token = self.cache.begin_optimistic_update(&list_key, |current| {
            list_of(current).map(|mut list| {
                for item in list.iter_mut().filter(|a| a.id == id) {
                    *item = item.requeued(now);
                }
                CacheValue::ApplianceList(list)
            })
        });

        match self.client.retry_appliance(id).await {
            Ok(confirmed) => {
                let confirmed = confirmed.normalized();
                tracing::info!("requeued appliance {}", id);
                self.commit_snapshot(&confirmed);
                drop((detail_token, list_token));
                Ok(confirmed)
            }
            Err(err) => {
                tracing::warn!("retrying appliance {} failed: {}", id, err);
                self.cache.rollback(detail_token);
                self.cache.rollback(list_token);
                Err(err)
            }
        }
    }

    /// Delete an appliance and stop polling it.
    pub async fn delete(&self, id: &str) -> KitchenResult<()> {
        if let Some(poller) = &self.poller {
            poller.stop_resource(id);
        }

        let list_token = self
            .cache
            .begin_optimistic_update(&CacheKey::appliances(), |current| {
                list_of(current).map(|mut list| {
                    list.retain(|a| a.id != id);
                    CacheValue::ApplianceList(list)
                })
            });
        let detail_token = self
            .cache
            .begin_optimistic_removal(&CacheKey::appliance(id));

        match self.client.delete_appliance(id).await {
            Ok(()) => {
                tracing::info!("deleted appliance {}", id);
                drop((list_token, detail_token));
                Ok(())
            }
            Err(err) => {
                tracing::warn!("deleting appliance {} failed: {}", id, err);
                self.cache.rollback(detail_token);
                self.cache.rollback(list_token);
                Err(err)
            }
        }
    }

    /// Write the server's snapshot to the detail entry and its list row.
    fn commit_snapshot(&self, confirmed: &Appliance) {
        self.cache.commit(
            &CacheKey::appliance(&confirmed.id),
            CacheValue::Appliance(confirmed.clone()),
        );
        self.cache.update(&CacheKey::appliances(), |current| {
            list_of(current).map(|mut list| {
                for item in list.iter_mut().filter(|a| a.id == confirmed.id) {
                    *item = confirmed.clone();
                }
                CacheValue::ApplianceList(list)
            })
        });
    }
}
