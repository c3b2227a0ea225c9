//! Store and backend contract traits.
//!
//! [`FeatureStore`] is the interface served to callers. The `*Core` traits
//! are the minimal contract a storage backend implements in order to be
//! wrapped by [`crate::wrapper`]: the wrapper supplies caching, tombstone
//! filtering, and initialization memoization, so a core only performs raw
//! reads and version-arbitrated writes.

use async_trait::async_trait;
use flagstore_core::{AllData, DataKind, StoreCollection, StoreItem, StoreResult};
use std::collections::HashMap;
use std::time::Duration;

/// Public store interface.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Get a single item. Tombstoned and missing keys both read as `None`.
    async fn get(&self, kind: DataKind, key: &str) -> StoreResult<Option<StoreItem>>;

    /// Get all items of a kind, tombstones filtered out.
    async fn all(&self, kind: DataKind) -> StoreResult<HashMap<String, StoreItem>>;

    /// Replace the entire dataset with `all_data`.
    async fn init(&self, all_data: AllData) -> StoreResult<()>;

    /// Insert or update an item. A write whose version does not exceed the
    /// stored version is rejected and the stored item stays authoritative;
    /// this is a normal outcome, not an error.
    async fn upsert(&self, kind: DataKind, item: StoreItem) -> StoreResult<()>;

    /// Delete `key` at `version` by writing a tombstone, subject to the same
    /// version arbitration as `upsert`.
    async fn delete(&self, kind: DataKind, key: &str, version: u64) -> StoreResult<()>;

    /// Whether the store has ever held a full dataset.
    async fn initialized(&self) -> bool;
}

/// Operations shared by every storage backend core.
///
/// Cores do not filter tombstones and do not cache; they surface exactly what
/// the backing medium holds.
#[async_trait]
pub trait StoreCoreBase: Send + Sync {
    /// How long the wrapper may serve cached results from this backend.
    ///
    /// `Duration::ZERO` disables caching: every read passes through.
    fn cache_ttl(&self) -> Duration;

    /// Fetch one item, tombstones included. `None` means the key has never
    /// existed in the backend.
    async fn get_internal(&self, kind: DataKind, key: &str) -> StoreResult<Option<StoreItem>>;

    /// Fetch every item of a kind, tombstones included.
    async fn get_all_internal(&self, kind: DataKind) -> StoreResult<HashMap<String, StoreItem>>;

    /// Write `item` unless the stored version is equal or higher. Returns
    /// whichever item is authoritative afterwards: the new item if the write
    /// was accepted, the existing one if it was rejected. Must be safe under
    /// concurrent writers to the same key.
    async fn upsert_internal(&self, kind: DataKind, item: StoreItem) -> StoreResult<StoreItem>;

    /// Whether the backend already holds data for these kinds.
    async fn initialized_internal(&self) -> bool;
}

/// Backend that can replace its whole dataset in one atomic operation.
#[async_trait]
pub trait StoreCore: StoreCoreBase {
    /// Replace everything with `all_data`, all-or-nothing.
    async fn init_internal(&self, all_data: AllData) -> StoreResult<()>;
}

/// Backend that cannot replace its dataset atomically and instead consumes
/// ordered collections, writing items strictly in the order given.
#[async_trait]
pub trait NonAtomicStoreCore: StoreCoreBase {
    /// Write the collections in order. The order satisfies the dependency
    /// constraints produced by [`crate::dependency::sort_all_collections`].
    async fn init_collections_internal(
        &self,
        collections: Vec<StoreCollection>,
    ) -> StoreResult<()>;
}
