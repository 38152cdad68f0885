//! Tailoring run storage.

use crate::models::{TailorKey, TailoringRun};

use super::{CacheKey, CacheValue, QueryCache};

impl QueryCache {
    /// Run cached for this recipe and appliance selection.
    pub fn run(&self, key: &TailorKey) -> Option<TailoringRun> {
        self.lock()
            .get(&CacheKey::tailoring(key))
            .and_then(CacheValue::as_run)
            .cloned()
    }

    /// Store a run under the key derived from its recipe and appliances.
    pub fn set_run(&self, run: TailoringRun) {
        let key = CacheKey::tailoring(&run.key());
        self.lock().write(&key, Some(CacheValue::Run(run)));
    }

    /// Store `run` unless its key is already occupied. Returns the run that
    /// ends up cached.
    pub fn set_run_if_absent(&self, run: TailoringRun) -> TailoringRun {
        let key = CacheKey::tailoring(&run.key());
        let mut state = self.lock();
        if let Some(CacheValue::Run(existing)) = state.get(&key) {
            return existing.clone();
        }
        state.write(&key, Some(CacheValue::Run(run.clone())));
        run
    }

    /// Mutate the cached run in place and return the closure's result.
    ///
    /// Returns `None` when no run is cached under `key`.
    pub fn update_run<F, R>(&self, key: &TailorKey, f: F) -> Option<R>
    where
        F: FnOnce(&mut TailoringRun) -> R,
    {
        let cache_key = CacheKey::tailoring(key);
        let mut state = self.lock();
        let result = match state.get_mut(&cache_key) {
            Some(CacheValue::Run(run)) => f(run),
            _ => return None,
        };
        state.touch(&cache_key);
        Some(result)
    }
}
