//! Provisional writes with rollback.

use super::{CacheKey, CacheValue, QueryCache};

/// Handle to undo one provisional write.
///
/// Holds the value the key had before the write. Rolling back restores it
/// (or removes the key if it was empty) only while the provisional write is
/// still the latest write to that key.
#[derive(Debug, Clone)]
#[must_use = "an optimistic write should be committed or rolled back"]
pub struct RollbackToken {
    key: CacheKey,
    previous: Option<CacheValue>,
    version: u64,
}

impl RollbackToken {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Value the key held before the provisional write.
    pub fn previous(&self) -> Option<&CacheValue> {
        self.previous.as_ref()
    }
}

impl QueryCache {
    /// Write `provisional` under `key` ahead of server confirmation.
    pub fn begin_optimistic(&self, key: &CacheKey, provisional: CacheValue) -> RollbackToken {
        self.begin_optimistic_update(key, |_| Some(provisional))
    }

    /// Remove `key` ahead of server confirmation.
    pub fn begin_optimistic_removal(&self, key: &CacheKey) -> RollbackToken {
        self.begin_optimistic_update(key, |_| None)
    }

    /// Derive the provisional value from the current one, atomically.
    ///
    /// `updater` returning `None` removes the key.
    pub fn begin_optimistic_update<F>(&self, key: &CacheKey, updater: F) -> RollbackToken
    where
        F: FnOnce(Option<&CacheValue>) -> Option<CacheValue>,
    {
        let mut state = self.lock();
        let previous = state.get(key).cloned();
        let provisional = updater(previous.as_ref());
        let version = state.write(key, provisional);
        RollbackToken {
            key: key.clone(),
            previous,
            version,
        }
    }

    /// Replace the provisional value with the confirmed one.
    ///
    /// The confirmed value is written as-is; it supersedes the provisional
    /// write, so a later rollback of the same token does nothing.
    pub fn commit(&self, key: &CacheKey, value: CacheValue) {
        self.lock().write(key, Some(value));
    }

    /// Undo the provisional write behind `token`.
    ///
    /// Returns `false` without touching the cache if the key has been written
    /// since; that later write is newer information than the snapshot taken
    /// before the provisional write.
    pub fn rollback(&self, token: RollbackToken) -> bool {
        let mut state = self.lock();
        if state.version(&token.key) != token.version {
            tracing::debug!("skipping rollback of {}: overwritten since", token.key);
            return false;
        }
        state.write(&token.key, token.previous);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::appliance;
    use crate::models::ApplianceStatus;

    fn list(ids: &[&str]) -> CacheValue {
        CacheValue::ApplianceList(
            ids.iter()
                .map(|id| appliance(id, ApplianceStatus::Ready, 100, 1))
                .collect(),
        )
    }

    #[test]
    fn test_rollback_restores_previous_value() {
        let cache = QueryCache::new();
        let key = CacheKey::appliances();
        cache.set(&key, list(&["a1"]));

        let token = cache.begin_optimistic(&key, list(&["temp-1", "a1"]));
        assert_eq!(cache.appliances().unwrap().len(), 2);
        assert_eq!(token.previous(), Some(&list(&["a1"])));

        assert!(cache.rollback(token));
        assert_eq!(cache.get(&key), Some(list(&["a1"])));
    }

    #[test]
    fn test_optimistic_update_derives_from_current() {
        let cache = QueryCache::new();
        let key = CacheKey::appliances();
        cache.set(&key, list(&["a1", "a2"]));

        let token = cache.begin_optimistic_update(&key, |current| {
            let remaining = current
                .and_then(CacheValue::as_appliance_list)
                .unwrap_or_default()
                .iter()
                .filter(|a| a.id != "a1")
                .cloned()
                .collect();
            Some(CacheValue::ApplianceList(remaining))
        });
        assert_eq!(cache.get(&key), Some(list(&["a2"])));

        assert!(cache.rollback(token));
        assert_eq!(cache.get(&key), Some(list(&["a1", "a2"])));
    }

    #[test]
    fn test_rollback_removes_entry_that_did_not_exist() {
        let cache = QueryCache::new();
        let key = CacheKey::appliance("temp-1");

        let token = cache.begin_optimistic(
            &key,
            CacheValue::Appliance(appliance("temp-1", ApplianceStatus::Queued, 0, 1)),
        );
        assert!(cache.contains(&key));

        assert!(cache.rollback(token));
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_rollback_of_removal_restores_value() {
        let cache = QueryCache::new();
        let key = CacheKey::appliance("a1");
        let value = CacheValue::Appliance(appliance("a1", ApplianceStatus::Ready, 100, 1));
        cache.set(&key, value.clone());

        let token = cache.begin_optimistic_removal(&key);
        assert!(!cache.contains(&key));

        assert!(cache.rollback(token));
        assert_eq!(cache.get(&key), Some(value));
    }

    #[test]
    fn test_commit_supersedes_token() {
        let cache = QueryCache::new();
        let key = CacheKey::appliances();
        cache.set(&key, list(&["a1"]));

        let token = cache.begin_optimistic(&key, list(&["temp-1", "a1"]));
        cache.commit(&key, list(&["a2", "a1"]));

        assert!(!cache.rollback(token));
        assert_eq!(cache.get(&key), Some(list(&["a2", "a1"])));
    }

    #[test]
    fn test_rollback_after_concurrent_write_is_noop() {
        let cache = QueryCache::new();
        let key = CacheKey::appliances();
        cache.set(&key, list(&["a1"]));

        let token = cache.begin_optimistic(&key, list(&["temp-1", "a1"]));
        cache.set(&key, list(&["a1", "a3"]));

        assert!(!cache.rollback(token));
        assert_eq!(cache.get(&key), Some(list(&["a1", "a3"])));
    }

    #[test]
    fn test_independent_keys_roll_back_independently() {
        let cache = QueryCache::new();
        let list_key = CacheKey::appliances();
        let detail_key = CacheKey::appliance("a1");
        cache.set(&list_key, list(&["a1"]));
        cache.set(
            &detail_key,
            CacheValue::Appliance(appliance("a1", ApplianceStatus::Ready, 100, 1)),
        );

        let list_token = cache.begin_optimistic(&list_key, list(&[]));
        let detail_token = cache.begin_optimistic_removal(&detail_key);

        assert!(cache.rollback(detail_token));
        assert!(cache.contains(&detail_key));
        assert_eq!(cache.appliances().unwrap().len(), 0);

        assert!(cache.rollback(list_token));
        assert_eq!(cache.appliances().unwrap().len(), 1);
    }
}
