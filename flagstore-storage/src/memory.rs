//! In-memory store.

use crate::traits::FeatureStore;
use async_trait::async_trait;
use flagstore_core::{AllData, DataKind, StoreError, StoreItem, StoreResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Store that keeps the full dataset in process memory.
///
/// Reads are already in-process, so there is no TTL cache in front of this
/// store: it implements [`FeatureStore`] directly rather than going through a
/// caching wrapper, and applies the same version arbitration and tombstone
/// rules as any backend.
#[derive(Debug, Default)]
pub struct InMemoryFeatureStore {
    state: RwLock<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    all_data: AllData,
    inited: bool,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn get(&self, kind: DataKind, key: &str) -> StoreResult<Option<StoreItem>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state
            .all_data
            .get(&kind)
            .and_then(|items| items.get(key))
            .filter(|item| !item.is_deleted())
            .cloned())
    }

    async fn all(&self, kind: DataKind) -> StoreResult<HashMap<String, StoreItem>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state
            .all_data
            .get(&kind)
            .map(|items| {
                items
                    .iter()
                    .filter(|(_, item)| !item.is_deleted())
                    .map(|(key, item)| (key.clone(), item.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn init(&self, mut all_data: AllData) -> StoreResult<()> {
        for kind in DataKind::ALL {
            all_data.entry(kind).or_default();
        }
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        state.all_data = all_data;
        state.inited = true;
        Ok(())
    }

    async fn upsert(&self, kind: DataKind, item: StoreItem) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let items = state.all_data.entry(kind).or_default();
        match items.get(item.key()) {
            Some(existing) if existing.version() >= item.version() => {}
            _ => {
                items.insert(item.key().to_string(), item);
            }
        }
        Ok(())
    }

    async fn delete(&self, kind: DataKind, key: &str, version: u64) -> StoreResult<()> {
        self.upsert(kind, kind.make_tombstone(key, version)).await
    }

    async fn initialized(&self) -> bool {
        self.state.read().map(|state| state.inited).unwrap_or(false)
    }
}
