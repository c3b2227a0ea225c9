//! Core entity structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// KINDS
// ============================================================================

/// Category of versioned item a store can hold.
///
/// Kinds form a closed set. [`DataKind::ALL`] lists them in bulk-write
/// priority order: kinds that other kinds may depend on come first, so a
/// backend that writes incrementally never persists an item before the items
/// it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// User segments. Flags may reference segments, so these are written first.
    Segments,
    /// Feature flags. Flags may carry prerequisite references to other flags.
    Flags,
}

impl DataKind {
    /// All kinds, in bulk-write priority order.
    pub const ALL: [DataKind; 2] = [DataKind::Segments, DataKind::Flags];

    /// Whether items of this kind can reference other items of the same kind.
    pub fn has_dependencies(&self) -> bool {
        matches!(self, DataKind::Flags)
    }

    /// Keys of same-kind items that `item` must be written after.
    ///
    /// Empty for kinds without a dependency relation, and for an item that
    /// does not belong to this kind.
    pub fn dependency_keys<'a>(&self, item: &'a StoreItem) -> Vec<&'a str> {
        match (self, item) {
            (DataKind::Flags, StoreItem::Flag(flag)) => {
                flag.prerequisites.iter().map(|p| p.key.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Build the tombstone that marks `key` deleted at `version`.
    ///
    /// Tombstones are retained in the backend so a stale write with an
    /// equal-or-lower version cannot resurrect the key.
    pub fn make_tombstone(&self, key: &str, version: u64) -> StoreItem {
        match self {
            DataKind::Flags => StoreItem::Flag(FeatureFlag {
                key: key.to_string(),
                version,
                deleted: true,
                prerequisites: Vec::new(),
            }),
            DataKind::Segments => StoreItem::Segment(Segment {
                key: key.to_string(),
                version,
                deleted: true,
            }),
        }
    }
}

// ============================================================================
// ITEMS
// ============================================================================

/// Reference from a flag to another flag that must be persisted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub key: String,
}

impl Prerequisite {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// A versioned feature flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    /// Unique key within the Flags kind.
    pub key: String,
    /// Monotonically-intended version number.
    pub version: u64,
    /// Tombstone marker. A deleted flag is retained, not removed.
    pub deleted: bool,
    /// Flags that must exist in the store before this one, in declared order.
    pub prerequisites: Vec<Prerequisite>,
}

impl FeatureFlag {
    pub fn new(key: impl Into<String>, version: u64) -> Self {
        Self {
            key: key.into(),
            version,
            deleted: false,
            prerequisites: Vec::new(),
        }
    }

    /// Set the prerequisite list.
    pub fn with_prerequisites(mut self, keys: &[&str]) -> Self {
        self.prerequisites = keys.iter().map(|k| Prerequisite::new(*k)).collect();
        self
    }

    /// Mark the flag deleted.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

/// A versioned user segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Unique key within the Segments kind.
    pub key: String,
    /// Monotonically-intended version number.
    pub version: u64,
    /// Tombstone marker. A deleted segment is retained, not removed.
    pub deleted: bool,
}

impl Segment {
    pub fn new(key: impl Into<String>, version: u64) -> Self {
        Self {
            key: key.into(),
            version,
            deleted: false,
        }
    }
}

/// A versioned item of any kind.
///
/// This is a closed tagged union rather than a trait object: the set of kinds
/// is fixed, and stores dispatch on [`DataKind`] rather than on runtime type
/// information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreItem {
    Flag(FeatureFlag),
    Segment(Segment),
}

impl StoreItem {
    /// The item's unique key within its kind.
    pub fn key(&self) -> &str {
        match self {
            StoreItem::Flag(f) => &f.key,
            StoreItem::Segment(s) => &s.key,
        }
    }

    /// The item's version number.
    pub fn version(&self) -> u64 {
        match self {
            StoreItem::Flag(f) => f.version,
            StoreItem::Segment(s) => s.version,
        }
    }

    /// Whether the item is a tombstone.
    pub fn is_deleted(&self) -> bool {
        match self {
            StoreItem::Flag(f) => f.deleted,
            StoreItem::Segment(s) => s.deleted,
        }
    }

    /// The kind this item belongs to.
    pub fn kind(&self) -> DataKind {
        match self {
            StoreItem::Flag(_) => DataKind::Flags,
            StoreItem::Segment(_) => DataKind::Segments,
        }
    }
}

impl From<FeatureFlag> for StoreItem {
    fn from(flag: FeatureFlag) -> Self {
        StoreItem::Flag(flag)
    }
}

impl From<Segment> for StoreItem {
    fn from(segment: Segment) -> Self {
        StoreItem::Segment(segment)
    }
}

// ============================================================================
// COLLECTIONS
// ============================================================================

/// Full dataset handed to a bulk initialization: kind to key to item.
pub type AllData = HashMap<DataKind, HashMap<String, StoreItem>>;

/// A (kind, ordered items) pair for backends that write incrementally.
///
/// Item order is semantically meaningful: a backend consuming a collection
/// must write items strictly in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCollection {
    pub kind: DataKind,
    pub items: Vec<StoreItem>,
}
