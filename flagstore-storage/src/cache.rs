//! TTL cache for store reads.
//!
//! One cache instance holds three logical regions: per-item results, per-kind
//! snapshots, and the backend initialization flag. All three live behind a
//! single mutex so a write can update several regions atomically with respect
//! to concurrent readers. Entries expire lazily: staleness is checked at read
//! time against a monotonic clock, and nothing runs in the background.

use flagstore_core::{AllData, DataKind, StoreItem};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Default)]
struct CacheState {
    items: HashMap<DataKind, HashMap<String, CacheEntry<Option<StoreItem>>>>,
    snapshots: HashMap<DataKind, CacheEntry<HashMap<String, StoreItem>>>,
    initialized: Option<CacheEntry<bool>>,
}

/// Expiring cache in front of a storage backend.
///
/// A TTL of zero disables the cache entirely: every `put` is a no-op and
/// every `get` reports a miss, so all reads pass through to the backend.
#[derive(Debug)]
pub struct StoreCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl StoreCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Whether caching is active.
    pub fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    // Every critical section is a single map operation, so a poisoned lock
    // still guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry<V>(&self, value: V) -> CacheEntry<V> {
        CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        }
    }

    /// Look up a single-item result.
    ///
    /// The outer `Option` is hit/miss; the inner value is the cached result,
    /// where `None` records that the key was read as absent.
    pub fn get_item(&self, kind: DataKind, key: &str) -> Option<Option<StoreItem>> {
        if !self.enabled() {
            return None;
        }
        let mut state = self.lock();
        let by_key = state.items.get_mut(&kind)?;
        match by_key.get(key) {
            Some(entry) if entry.is_fresh() => Some(entry.value.clone()),
            Some(_) => {
                by_key.remove(key);
                None
            }
            None => None,
        }
    }

    /// Record a single-item result; `None` caches the key as absent.
    pub fn put_item(&self, kind: DataKind, key: &str, item: Option<StoreItem>) {
        if !self.enabled() {
            return;
        }
        let entry = self.entry(item);
        self.lock()
            .items
            .entry(kind)
            .or_default()
            .insert(key.to_string(), entry);
    }

    /// Look up the full snapshot of a kind.
    pub fn get_all(&self, kind: DataKind) -> Option<HashMap<String, StoreItem>> {
        if !self.enabled() {
            return None;
        }
        let mut state = self.lock();
        match state.snapshots.get(&kind) {
            Some(entry) if entry.is_fresh() => Some(entry.value.clone()),
            Some(_) => {
                state.snapshots.remove(&kind);
                None
            }
            None => None,
        }
    }

    /// Record the full snapshot of a kind.
    pub fn put_all(&self, kind: DataKind, items: HashMap<String, StoreItem>) {
        if !self.enabled() {
            return;
        }
        let entry = self.entry(items);
        self.lock().snapshots.insert(kind, entry);
    }

    /// Record the authoritative result of a write: refresh the per-key entry
    /// and drop the kind's snapshot in one atomic step, so a concurrent read
    /// sees either the pre-write or the post-write cache state.
    pub fn refresh_after_write(&self, kind: DataKind, key: &str, item: Option<StoreItem>) {
        if !self.enabled() {
            return;
        }
        let entry = self.entry(item);
        let mut state = self.lock();
        state
            .items
            .entry(kind)
            .or_default()
            .insert(key.to_string(), entry);
        state.snapshots.remove(&kind);
    }

    /// Look up the cached initialization answer.
    pub fn get_initialized(&self) -> Option<bool> {
        if !self.enabled() {
            return None;
        }
        let mut state = self.lock();
        match &state.initialized {
            Some(entry) if entry.is_fresh() => Some(entry.value),
            Some(_) => {
                state.initialized = None;
                None
            }
            None => None,
        }
    }

    /// Record the initialization answer.
    pub fn put_initialized(&self, value: bool) {
        if !self.enabled() {
            return;
        }
        let entry = self.entry(value);
        self.lock().initialized = Some(entry);
    }

    /// Drop everything, then seed per-kind snapshots and per-key entries from
    /// a freshly written dataset. Tombstoned items seed as absent.
    pub fn seed(&self, all_data: &AllData) {
        if !self.enabled() {
            return;
        }
        let mut state = self.lock();
        state.items.clear();
        state.snapshots.clear();
        for (kind, items) in all_data {
            let visible: HashMap<String, StoreItem> = items
                .iter()
                .filter(|(_, item)| !item.is_deleted())
                .map(|(key, item)| (key.clone(), item.clone()))
                .collect();
            let by_key = state.items.entry(*kind).or_default();
            for (key, item) in items {
                let entry = CacheEntry {
                    value: (!item.is_deleted()).then(|| item.clone()),
                    expires_at: Instant::now() + self.ttl,
                };
                by_key.insert(key.clone(), entry);
            }
            let snapshot = CacheEntry {
                value: visible,
                expires_at: Instant::now() + self.ttl,
            };
            state.snapshots.insert(*kind, snapshot);
        }
    }
}
