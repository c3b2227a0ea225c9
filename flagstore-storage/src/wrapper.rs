//! Caching store wrappers.
//!
//! [`CachingStoreWrapper`] and [`NonAtomicCachingStoreWrapper`] turn a
//! minimal backend core into a full [`FeatureStore`]: reads consult the TTL
//! cache first, writes go to the backend for version arbitration and then
//! refresh the cache with whatever the backend reports as authoritative, and
//! bulk initialization for non-atomic backends is routed through the
//! dependency sorter. Backend calls always execute outside the cache lock, so
//! a slow backend never blocks unrelated cache reads.

use crate::cache::StoreCache;
use crate::dependency::sort_all_collections;
use crate::traits::{FeatureStore, NonAtomicStoreCore, StoreCore, StoreCoreBase};
use async_trait::async_trait;
use flagstore_core::{AllData, DataKind, StoreItem, StoreResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operation logic shared by both wrapper variants.
struct WrapperCommon<C> {
    core: Arc<C>,
    cache: StoreCache,
    inited: AtomicBool,
}

impl<C: StoreCoreBase> WrapperCommon<C> {
    fn new(core: Arc<C>) -> Self {
        let cache = StoreCache::new(core.cache_ttl());
        Self {
            core,
            cache,
            inited: AtomicBool::new(false),
        }
    }

    async fn get(&self, kind: DataKind, key: &str) -> StoreResult<Option<StoreItem>> {
        if let Some(cached) = self.cache.get_item(kind, key) {
            return Ok(cached);
        }
        let item = self.core.get_internal(kind, key).await?;
        let visible = item.filter(|item| !item.is_deleted());
        self.cache.put_item(kind, key, visible.clone());
        Ok(visible)
    }

    async fn all(&self, kind: DataKind) -> StoreResult<HashMap<String, StoreItem>> {
        if let Some(snapshot) = self.cache.get_all(kind) {
            return Ok(snapshot);
        }
        let items = self.core.get_all_internal(kind).await?;
        let visible: HashMap<String, StoreItem> = items
            .into_iter()
            .filter(|(_, item)| !item.is_deleted())
            .collect();
        self.cache.put_all(kind, visible.clone());
        Ok(visible)
    }

    async fn upsert(&self, kind: DataKind, item: StoreItem) -> StoreResult<()> {
        // The backend arbitrates by version. Whatever comes back is the truth,
        // including an existing newer item that beat this write, so the cache
        // is refreshed even for a rejected write. The kind's snapshot is
        // dropped unconditionally: the next all() recomputes from the backend
        // and picks up out-of-band changes as well.
        let authoritative = self.core.upsert_internal(kind, item).await?;
        let key = authoritative.key().to_string();
        let visible = (!authoritative.is_deleted()).then_some(authoritative);
        self.cache.refresh_after_write(kind, &key, visible);
        Ok(())
    }

    async fn delete(&self, kind: DataKind, key: &str, version: u64) -> StoreResult<()> {
        self.upsert(kind, kind.make_tombstone(key, version)).await
    }

    async fn initialized(&self) -> bool {
        if self.inited.load(Ordering::Acquire) {
            return true;
        }
        if let Some(cached) = self.cache.get_initialized() {
            if cached {
                self.inited.store(true, Ordering::Release);
            }
            return cached;
        }
        let result = self.core.initialized_internal().await;
        if result {
            // once observed true, never queried again
            self.inited.store(true, Ordering::Release);
        } else {
            self.cache.put_initialized(false);
        }
        result
    }

    fn finish_init(&self, all_data: &AllData) {
        self.cache.seed(all_data);
        self.inited.store(true, Ordering::Release);
    }
}

/// Caching wrapper for backends that replace their dataset atomically.
///
/// The cache TTL comes from the core itself; a core reporting a zero TTL gets
/// a pass-through wrapper where every read reaches the backend.
pub struct CachingStoreWrapper<C> {
    common: WrapperCommon<C>,
}

impl<C: StoreCore> CachingStoreWrapper<C> {
    pub fn new(core: Arc<C>) -> Self {
        Self {
            common: WrapperCommon::new(core),
        }
    }
}

#[async_trait]
impl<C: StoreCore> FeatureStore for CachingStoreWrapper<C> {
    async fn get(&self, kind: DataKind, key: &str) -> StoreResult<Option<StoreItem>> {
        self.common.get(kind, key).await
    }

    async fn all(&self, kind: DataKind) -> StoreResult<HashMap<String, StoreItem>> {
        self.common.all(kind).await
    }

    async fn init(&self, all_data: AllData) -> StoreResult<()> {
        self.common.core.init_internal(all_data.clone()).await?;
        self.common.finish_init(&all_data);
        Ok(())
    }

    async fn upsert(&self, kind: DataKind, item: StoreItem) -> StoreResult<()> {
        self.common.upsert(kind, item).await
    }

    async fn delete(&self, kind: DataKind, key: &str, version: u64) -> StoreResult<()> {
        self.common.delete(kind, key, version).await
    }

    async fn initialized(&self) -> bool {
        self.common.initialized().await
    }
}

/// Caching wrapper for backends that write incrementally.
///
/// Identical to [`CachingStoreWrapper`] except that bulk initialization runs
/// the dataset through the dependency sorter and hands the backend an ordered
/// list of collections.
pub struct NonAtomicCachingStoreWrapper<C> {
    common: WrapperCommon<C>,
}

impl<C: NonAtomicStoreCore> NonAtomicCachingStoreWrapper<C> {
    pub fn new(core: Arc<C>) -> Self {
        Self {
            common: WrapperCommon::new(core),
        }
    }
}

#[async_trait]
impl<C: NonAtomicStoreCore> FeatureStore for NonAtomicCachingStoreWrapper<C> {
    async fn get(&self, kind: DataKind, key: &str) -> StoreResult<Option<StoreItem>> {
        self.common.get(kind, key).await
    }

    async fn all(&self, kind: DataKind) -> StoreResult<HashMap<String, StoreItem>> {
        self.common.all(kind).await
    }

    async fn init(&self, all_data: AllData) -> StoreResult<()> {
        let collections = sort_all_collections(&all_data);
        self.common.core.init_collections_internal(collections).await?;
        self.common.finish_init(&all_data);
        Ok(())
    }

    async fn upsert(&self, kind: DataKind, item: StoreItem) -> StoreResult<()> {
        self.common.upsert(kind, item).await
    }

    async fn delete(&self, kind: DataKind, key: &str, version: u64) -> StoreResult<()> {
        self.common.delete(kind, key, version).await
    }

    async fn initialized(&self) -> bool {
        self.common.initialized().await
    }
}
