//! Keyed store of appliance snapshots and tailoring runs.
//!
//! [`QueryCache`] is the single owner of every snapshot and run. The poller,
//! the tailoring controller and the appliance actions read and write through
//! it and never keep their own copies.
//!
//! - `mod.rs` - keys, values and raw `get`/`set`/`update`/`invalidate`
//! - `optimistic` - provisional writes with rollback tokens
//! - `reconciliation` - monotonic merging of fetched appliance snapshots
//! - `runs` - tailoring run storage

mod optimistic;
mod reconciliation;
mod runs;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{Appliance, TailorKey, TailoringRun};

pub use optimistic::RollbackToken;
pub use reconciliation::MergeOutcome;

const APPLIANCES: &str = "appliances";
const TAILORING: &str = "tailoring";

/// Hierarchical cache key.
///
/// Keys are segment paths such as `appliances` (the list) or
/// `appliances/<id>` (one snapshot), so invalidating a prefix reaches every
/// key below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Key of the appliance list.
    pub fn appliances() -> Self {
        Self::new([APPLIANCES])
    }

    /// Key of one appliance snapshot.
    pub fn appliance(id: &str) -> Self {
        Self::new([APPLIANCES, id])
    }

    /// Key of the run for a recipe and appliance selection.
    pub fn tailoring(key: &TailorKey) -> Self {
        Self(vec![
            TAILORING.to_string(),
            key.recipe_id().to_string(),
            key.appliances_param(),
        ])
    }

    /// Prefix covering every run of one recipe.
    pub fn tailoring_recipe(recipe_id: &str) -> Self {
        Self::new([TAILORING, recipe_id])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A cached value.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Appliance(Appliance),
    ApplianceList(Vec<Appliance>),
    Run(TailoringRun),
}

impl CacheValue {
    pub fn as_appliance(&self) -> Option<&Appliance> {
        match self {
            CacheValue::Appliance(appliance) => Some(appliance),
            _ => None,
        }
    }

    pub fn as_appliance_list(&self) -> Option<&[Appliance]> {
        match self {
            CacheValue::ApplianceList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_run(&self) -> Option<&TailoringRun> {
        match self {
            CacheValue::Run(run) => Some(run),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: CacheValue,
    version: u64,
}

/// Lock-protected state. Every write bumps `clock` and records the new
/// version for its key, including removals, so rollback tokens can tell
/// whether their provisional write is still the latest one.
#[derive(Debug, Default)]
pub(crate) struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    versions: HashMap<CacheKey, u64>,
    clock: u64,
}

impl CacheState {
    fn get(&self, key: &CacheKey) -> Option<&CacheValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    fn get_mut(&mut self, key: &CacheKey) -> Option<&mut CacheValue> {
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    fn next_version(&mut self, key: &CacheKey) -> u64 {
        self.clock += 1;
        self.versions.insert(key.clone(), self.clock);
        self.clock
    }

    fn write(&mut self, key: &CacheKey, value: Option<CacheValue>) -> u64 {
        let version = self.next_version(key);
        match value {
            Some(value) => {
                self.entries.insert(key.clone(), Entry { value, version });
            }
            None => {
                self.entries.remove(key);
            }
        }
        version
    }

    /// Mark an in-place mutation of an existing entry as a new write.
    fn touch(&mut self, key: &CacheKey) {
        let version = self.next_version(key);
        if let Some(entry) = self.entries.get_mut(key) {
            entry.version = version;
        }
    }

    fn version(&self, key: &CacheKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }
}

/// Shared handle to the cache.
///
/// Clones share one store. Every operation takes the lock once and applies
/// its write atomically; no lock is held across an `.await`, so writes for a
/// key are applied in call order.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Store `value` under `key`, replacing anything there.
    pub fn set(&self, key: &CacheKey, value: CacheValue) {
        self.lock().write(key, Some(value));
    }

    /// Replace the value under `key` with the result of `updater`.
    ///
    /// The updater sees the current value and returns the new one; returning
    /// `None` removes the entry. Runs under the lock, so it must not block.
    pub fn update<F>(&self, key: &CacheKey, updater: F)
    where
        F: FnOnce(Option<&CacheValue>) -> Option<CacheValue>,
    {
        let mut state = self.lock();
        let next = updater(state.get(key));
        state.write(key, next);
    }

    /// Remove the entry under `key`. Returns the removed value.
    pub fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut state = self.lock();
        let previous = state.get(key).cloned();
        if previous.is_some() {
            state.write(key, None);
        }
        previous
    }

    /// Drop every entry whose key starts with `prefix`, forcing the next
    /// reader to refetch. Returns how many entries were dropped.
    pub fn invalidate(&self, prefix: &CacheKey) -> usize {
        let mut state = self.lock();
        let keys: Vec<CacheKey> = state
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            state.write(key, None);
        }
        if !keys.is_empty() {
            tracing::debug!("invalidated {} cache entries under {}", keys.len(), prefix);
        }
        keys.len()
    }

    /// Current snapshot of one appliance: the detail entry, else its
    /// element in the cached list.
    pub fn appliance(&self, id: &str) -> Option<Appliance> {
        let state = self.lock();
        if let Some(value) = state.get(&CacheKey::appliance(id)) {
            return value.as_appliance().cloned();
        }
        state
            .get(&CacheKey::appliances())
            .and_then(CacheValue::as_appliance_list)
            .and_then(|list| list.iter().find(|a| a.id == id))
            .cloned()
    }

    /// Current appliance list.
    pub fn appliances(&self) -> Option<Vec<Appliance>> {
        self.lock()
            .get(&CacheKey::appliances())
            .and_then(CacheValue::as_appliance_list)
            .map(<[Appliance]>::to_vec)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ApplianceStatus;
    use chrono::{DateTime, TimeZone, Utc};

    pub(crate) fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
    }

    pub(crate) fn appliance(id: &str, status: ApplianceStatus, progress: u8, secs: i64) -> Appliance {
        Appliance {
            id: id.to_string(),
            brand: "Breville".to_string(),
            model: "Smart Oven Air".to_string(),
            nickname: None,
            status,
            progress,
            created_at: at(0),
            updated_at: at(secs),
            manual_file_name: Some("oven.pdf".to_string()),
            manual_url: None,
            detail: None,
        }
        .normalized()
    }

    #[test]
    fn test_key_prefixes() {
        let list = CacheKey::appliances();
        let one = CacheKey::appliance("a1");
        assert!(one.starts_with(&list));
        assert!(!list.starts_with(&one));
        assert_eq!(one.to_string(), "appliances/a1");

        let run = CacheKey::tailoring(&TailorKey::new("r1", ["B", "A"]));
        assert_eq!(run.to_string(), "tailoring/r1/A,B");
        assert!(run.starts_with(&CacheKey::tailoring_recipe("r1")));
        assert!(!run.starts_with(&CacheKey::tailoring_recipe("r2")));
    }

    #[test]
    fn test_set_get_and_clone_share_state() {
        let cache = QueryCache::new();
        let other = cache.clone();
        let key = CacheKey::appliance("a1");

        cache.set(&key, CacheValue::Appliance(appliance("a1", ApplianceStatus::Queued, 0, 1)));
        assert_eq!(
            other.appliance("a1").map(|a| a.status),
            Some(ApplianceStatus::Queued)
        );
    }

    #[test]
    fn test_update_with_function() {
        let cache = QueryCache::new();
        let key = CacheKey::appliances();
        cache.set(
            &key,
            CacheValue::ApplianceList(vec![appliance("a1", ApplianceStatus::Queued, 0, 1)]),
        );

        cache.update(&key, |current| {
            let mut list = current
                .and_then(CacheValue::as_appliance_list)
                .map(<[Appliance]>::to_vec)
                .unwrap_or_default();
            list.push(appliance("a2", ApplianceStatus::Ready, 100, 2));
            Some(CacheValue::ApplianceList(list))
        });
        assert_eq!(cache.appliances().unwrap().len(), 2);

        cache.update(&key, |_| None);
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = QueryCache::new();
        cache.set(&CacheKey::appliances(), CacheValue::ApplianceList(Vec::new()));
        cache.set(
            &CacheKey::appliance("a1"),
            CacheValue::Appliance(appliance("a1", ApplianceStatus::Queued, 0, 1)),
        );
        let run_key = TailorKey::new("r1", ["A"]);
        cache.set(
            &CacheKey::tailoring(&run_key),
            CacheValue::Run(TailoringRun::new(&run_key)),
        );

        assert_eq!(cache.invalidate(&CacheKey::appliances()), 2);
        assert!(cache.appliance("a1").is_none());
        assert!(cache.run(&run_key).is_some());
    }

    #[test]
    fn test_remove() {
        let cache = QueryCache::new();
        let key = CacheKey::appliance("a1");
        assert!(cache.remove(&key).is_none());

        cache.set(&key, CacheValue::Appliance(appliance("a1", ApplianceStatus::Ready, 100, 1)));
        assert!(cache.remove(&key).is_some());
        assert!(cache.get(&key).is_none());
    }
}
