//! Monotonic merging of fetched appliance snapshots.
//!
//! Acceptance is decided by comparing the incoming snapshot with the cached
//! one, never by arrival order:
//! - an older `updated_at` is stale
//! - the lifecycle only moves forward, except `error -> queued` (a retry)
//!   with a strictly newer timestamp
//! - progress never decreases within the same non-terminal state

use crate::error::UpdateRejected;
use crate::models::{Appliance, ApplianceStatus};

use super::{CacheKey, CacheState, CacheValue, QueryCache};

/// What a merge did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No snapshot for this id was cached.
    Inserted,
    /// The cached snapshot was replaced.
    Updated,
    /// The incoming snapshot equals the cached one.
    Unchanged,
}

/// Decide whether `incoming` may replace `current`.
pub(crate) fn check_update(current: &Appliance, incoming: &Appliance) -> Result<(), UpdateRejected> {
    if incoming.updated_at < current.updated_at {
        return Err(UpdateRejected::Stale {
            id: incoming.id.clone(),
            incoming: incoming.updated_at,
            current: current.updated_at,
        });
    }

    let illegal = || UpdateRejected::IllegalTransition {
        id: incoming.id.clone(),
        from: current.status,
        to: incoming.status,
    };

    if current.status.is_terminal() {
        if incoming.status == current.status {
            return Ok(());
        }
        let retried = current.status == ApplianceStatus::Error
            && incoming.status == ApplianceStatus::Queued
            && incoming.updated_at > current.updated_at;
        return if retried { Ok(()) } else { Err(illegal()) };
    }

    if incoming.status.rank() < current.status.rank() {
        return Err(illegal());
    }

    if incoming.status == current.status && incoming.progress < current.progress {
        return Err(UpdateRejected::ProgressRegression {
            id: incoming.id.clone(),
            current: current.progress,
            incoming: incoming.progress,
        });
    }

    Ok(())
}

impl CacheState {
    /// Canonical snapshot for `id`: the detail entry, else the list element.
    fn current_appliance(&self, id: &str) -> Result<Option<Appliance>, UpdateRejected> {
        let key = CacheKey::appliance(id);
        match self.get(&key) {
            Some(CacheValue::Appliance(appliance)) => return Ok(Some(appliance.clone())),
            Some(_) => {
                return Err(UpdateRejected::KindMismatch {
                    key: key.to_string(),
                })
            }
            None => {}
        }
        Ok(self
            .get(&CacheKey::appliances())
            .and_then(CacheValue::as_appliance_list)
            .and_then(|list| list.iter().find(|a| a.id == id))
            .cloned())
    }

    /// Replace the list element with the same id, if the list holds one.
    fn replace_in_list(&mut self, appliance: &Appliance) {
        let key = CacheKey::appliances();
        let replaced = match self.get_mut(&key) {
            Some(CacheValue::ApplianceList(list)) => {
                match list.iter_mut().find(|a| a.id == appliance.id) {
                    Some(slot) => {
                        *slot = appliance.clone();
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };
        if replaced {
            self.touch(&key);
        }
    }
}

impl QueryCache {
    /// Merge a fetched snapshot into the cache.
    ///
    /// On acceptance the detail entry is written and the matching list
    /// element, if any, is replaced in place. Rejections leave the cache
    /// untouched; callers log them at debug level and move on.
    pub fn merge_appliance(&self, incoming: Appliance) -> Result<MergeOutcome, UpdateRejected> {
        let incoming = incoming.normalized();
        let mut state = self.lock();

        let outcome = match state.current_appliance(&incoming.id)? {
            None => MergeOutcome::Inserted,
            Some(current) => {
                check_update(&current, &incoming)?;
                if current == incoming {
                    MergeOutcome::Unchanged
                } else {
                    MergeOutcome::Updated
                }
            }
        };

        let key = CacheKey::appliance(&incoming.id);
        if outcome == MergeOutcome::Unchanged && state.get(&key).is_some() {
            return Ok(outcome);
        }
        state.replace_in_list(&incoming);
        state.write(&key, Some(CacheValue::Appliance(incoming)));
        Ok(outcome)
    }

    /// Replace the list with a freshly fetched one.
    ///
    /// Each element passes the same guard as [`QueryCache::merge_appliance`];
    /// a rejected element keeps its cached snapshot. Provisional entries for
    /// uploads still in flight stay at the front. Cached detail entries are
    /// updated for accepted elements. Returns the stored list.
    pub fn merge_list(&self, incoming: Vec<Appliance>) -> Vec<Appliance> {
        let mut state = self.lock();
        let list_key = CacheKey::appliances();

        let mut merged: Vec<Appliance> = state
            .get(&list_key)
            .and_then(CacheValue::as_appliance_list)
            .unwrap_or_default()
            .iter()
            .filter(|a| a.is_provisional() && !incoming.iter().any(|i| i.id == a.id))
            .cloned()
            .collect();

        for item in incoming {
            let item = item.normalized();
            let current = match state.current_appliance(&item.id) {
                Ok(current) => current,
                Err(reason) => {
                    tracing::debug!("ignoring cached value for {}: {}", item.id, reason);
                    None
                }
            };
            let Some(current) = current else {
                merged.push(item);
                continue;
            };

            match check_update(&current, &item) {
                Ok(()) => {
                    let detail_key = CacheKey::appliance(&item.id);
                    if current != item && state.get(&detail_key).is_some() {
                        state.write(&detail_key, Some(CacheValue::Appliance(item.clone())));
                    }
                    merged.push(item);
                }
                Err(reason) => {
                    tracing::debug!("keeping cached snapshot: {}", reason);
                    merged.push(current);
                }
            }
        }

        state.write(&list_key, Some(CacheValue::ApplianceList(merged.clone())));
        merged
    }

    /// Swap a provisional list entry for the server-confirmed appliance.
    ///
    /// The confirmed appliance takes the provisional entry's position. If the
    /// provisional entry is gone (e.g. a refresh dropped it) the confirmed one
    /// is prepended unless the list already holds it.
    pub fn replace_provisional(&self, temp_id: &str, confirmed: Appliance) {
        let mut state = self.lock();
        let list_key = CacheKey::appliances();

        let mut list = state
            .get(&list_key)
            .and_then(CacheValue::as_appliance_list)
            .map(<[Appliance]>::to_vec)
            .unwrap_or_default();

        list.retain(|a| a.id != confirmed.id || a.id == temp_id);
        match list.iter().position(|a| a.id == temp_id) {
            Some(pos) => list[pos] = confirmed.clone(),
            None => list.insert(0, confirmed.clone()),
        }

        state.write(&list_key, Some(CacheValue::ApplianceList(list)));
        let temp_key = CacheKey::appliance(temp_id);
        if state.get(&temp_key).is_some() {
            state.write(&temp_key, None);
        }
        state.write(
            &CacheKey::appliance(&confirmed.id),
            Some(CacheValue::Appliance(confirmed)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{appliance, at};
    use ApplianceStatus::*;

    fn failed(id: &str, secs: i64) -> Appliance {
        let mut a = appliance(id, Error, 100, secs);
        a.detail = Some("Could not parse manual".to_string());
        a
    }

    #[test]
    fn test_first_merge_inserts() {
        let cache = QueryCache::new();
        assert_eq!(
            cache.merge_appliance(appliance("a1", Queued, 0, 1)),
            Ok(MergeOutcome::Inserted)
        );
        assert_eq!(cache.appliance("a1").unwrap().status, Queued);
    }

    #[test]
    fn test_forward_progress_accepted() {
        let cache = QueryCache::new();
        cache.merge_appliance(appliance("a1", Queued, 0, 1)).unwrap();
        assert_eq!(
            cache.merge_appliance(appliance("a1", Processing, 30, 2)),
            Ok(MergeOutcome::Updated)
        );
        assert_eq!(
            cache.merge_appliance(appliance("a1", Processing, 30, 2)),
            Ok(MergeOutcome::Unchanged)
        );
        cache.merge_appliance(appliance("a1", Ready, 100, 3)).unwrap();
        let current = cache.appliance("a1").unwrap();
        assert_eq!(current.status, Ready);
        assert_eq!(current.progress, 100);
    }

    #[test]
    fn test_late_processing_after_ready_rejected() {
        let cache = QueryCache::new();
        cache.merge_appliance(appliance("a1", Ready, 100, 5)).unwrap();

        // Newer timestamp but illegal transition
        let result = cache.merge_appliance(appliance("a1", Processing, 80, 6));
        assert!(matches!(
            result,
            Err(UpdateRejected::IllegalTransition { from: Ready, to: Processing, .. })
        ));

        // Older timestamp
        let result = cache.merge_appliance(appliance("a1", Processing, 80, 4));
        assert!(matches!(result, Err(UpdateRejected::Stale { .. })));

        assert_eq!(cache.appliance("a1").unwrap().status, Ready);
    }

    #[test]
    fn test_progress_regression_rejected() {
        let cache = QueryCache::new();
        cache.merge_appliance(appliance("a1", Processing, 60, 3)).unwrap();
        let result = cache.merge_appliance(appliance("a1", Processing, 40, 3));
        assert_eq!(
            result,
            Err(UpdateRejected::ProgressRegression {
                id: "a1".to_string(),
                current: 60,
                incoming: 40,
            })
        );
        assert_eq!(cache.appliance("a1").unwrap().progress, 60);
    }

    #[test]
    fn test_retry_requeue_accepted_only_when_newer() {
        let cache = QueryCache::new();
        cache.merge_appliance(failed("a1", 5)).unwrap();

        assert!(cache.merge_appliance(appliance("a1", Queued, 0, 5)).is_err());
        assert_eq!(
            cache.merge_appliance(appliance("a1", Queued, 0, 6)),
            Ok(MergeOutcome::Updated)
        );
        let current = cache.appliance("a1").unwrap();
        assert_eq!(current.progress, 0);
        assert_eq!(current.detail, None);
    }

    #[test]
    fn test_ready_to_error_rejected() {
        let cache = QueryCache::new();
        cache.merge_appliance(appliance("a1", Ready, 100, 5)).unwrap();
        assert!(cache.merge_appliance(failed("a1", 9)).is_err());
    }

    #[test]
    fn test_kind_mismatch() {
        let cache = QueryCache::new();
        cache.set(&CacheKey::appliance("a1"), CacheValue::ApplianceList(Vec::new()));
        assert!(matches!(
            cache.merge_appliance(appliance("a1", Queued, 0, 1)),
            Err(UpdateRejected::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_merge_updates_list_in_place() {
        let cache = QueryCache::new();
        cache.set(
            &CacheKey::appliances(),
            CacheValue::ApplianceList(vec![
                appliance("a1", Ready, 100, 1),
                appliance("a2", Queued, 0, 1),
                appliance("a3", Ready, 100, 1),
            ]),
        );

        cache.merge_appliance(appliance("a2", Processing, 10, 2)).unwrap();
        let list = cache.appliances().unwrap();
        let ids: Vec<&str> = list.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(list[1].status, Processing);
    }

    #[test]
    fn test_merge_list_keeps_newer_cached_snapshot() {
        let cache = QueryCache::new();
        cache.merge_appliance(appliance("a1", Ready, 100, 10)).unwrap();

        let merged = cache.merge_list(vec![
            appliance("a1", Processing, 50, 8),
            appliance("a2", Queued, 0, 8),
        ]);
        assert_eq!(merged[0].status, Ready);
        assert_eq!(merged[1].id, "a2");
        assert_eq!(cache.appliance("a1").unwrap().status, Ready);
    }

    #[test]
    fn test_merge_list_preserves_provisional_entries() {
        let cache = QueryCache::new();
        let mut provisional = appliance("temp-abc", Queued, 0, 1);
        provisional.updated_at = at(1);
        cache.set(
            &CacheKey::appliances(),
            CacheValue::ApplianceList(vec![provisional, appliance("a1", Ready, 100, 1)]),
        );

        let merged = cache.merge_list(vec![appliance("a1", Ready, 100, 1)]);
        let ids: Vec<&str> = merged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["temp-abc", "a1"]);
    }

    #[test]
    fn test_replace_provisional_preserves_position() {
        let cache = QueryCache::new();
        cache.set(
            &CacheKey::appliances(),
            CacheValue::ApplianceList(vec![
                appliance("a0", Ready, 100, 1),
                appliance("temp-abc", Queued, 0, 1),
                appliance("a1", Ready, 100, 1),
            ]),
        );

        cache.replace_provisional("temp-abc", appliance("a9", Queued, 0, 2));
        let ids: Vec<String> = cache.appliances().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a0", "a9", "a1"]);
        assert!(cache.appliance("a9").is_some());
    }

    #[test]
    fn test_replace_provisional_when_entry_was_dropped() {
        let cache = QueryCache::new();
        cache.set(
            &CacheKey::appliances(),
            CacheValue::ApplianceList(vec![appliance("a1", Ready, 100, 1)]),
        );

        cache.replace_provisional("temp-gone", appliance("a9", Queued, 0, 2));
        let ids: Vec<String> = cache.appliances().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a9", "a1"]);
    }

    /// Seeded Fisher-Yates shuffle.
    fn shuffle<T>(items: &mut [T], seed: u64) {
        let mut state = seed;
        for i in (1..items.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            items.swap(i, j);
        }
    }

    #[test]
    fn test_progress_monotonic_under_any_delivery_order() {
        let mut updates = vec![appliance("a1", Queued, 0, 0)];
        for step in 1..=9u8 {
            updates.push(appliance("a1", Processing, step * 10, step as i64));
        }
        updates.push(appliance("a1", Ready, 100, 10));

        for seed in 0..200u64 {
            let mut delivery = updates.clone();
            shuffle(&mut delivery, seed);

            let cache = QueryCache::new();
            let mut last: Option<Appliance> = None;
            for update in delivery {
                if cache.merge_appliance(update).is_ok() {
                    let current = cache.appliance("a1").unwrap();
                    if let Some(previous) = &last {
                        assert!(current.updated_at >= previous.updated_at);
                        assert!(current.status.rank() >= previous.status.rank());
                        if !current.is_terminal() && current.status == previous.status {
                            assert!(current.progress >= previous.progress, "seed {}", seed);
                        }
                    }
                    last = Some(current);
                }
            }

            let last = last.unwrap();
            if last.status == Ready {
                assert_eq!(last.progress, 100);
            }
        }
    }
}
