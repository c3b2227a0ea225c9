//! Dependency-aware ordering for bulk writes.
//!
//! Backends that cannot replace their dataset atomically consume an ordered
//! list of collections instead. The order must guarantee that nothing is
//! written before the items it references: the Segments collection precedes
//! Flags, and within Flags every item appears after its prerequisites.

use flagstore_core::{AllData, DataKind, StoreCollection, StoreItem};
use std::collections::{HashMap, HashSet};

/// Order a full dataset for incremental writing.
///
/// Kinds are emitted in [`DataKind::ALL`] priority order. Within a kind that
/// carries a dependency relation, items are ordered by an iterative
/// depth-first topological sort: prerequisites first, each item exactly once.
/// Prerequisite keys absent from the input are skipped, never an error. Keys
/// are walked in lexicographic order, so independent items keep a
/// reproducible relative order across runs.
pub fn sort_all_collections(all_data: &AllData) -> Vec<StoreCollection> {
    let mut collections = Vec::with_capacity(all_data.len());
    for kind in DataKind::ALL {
        if let Some(items) = all_data.get(&kind) {
            let items = if kind.has_dependencies() {
                sort_items_by_dependency(kind, items)
            } else {
                sorted_items(items)
            };
            collections.push(StoreCollection { kind, items });
        }
    }
    collections
}

fn sorted_keys(items: &HashMap<String, StoreItem>) -> Vec<&String> {
    let mut keys: Vec<&String> = items.keys().collect();
    keys.sort();
    keys
}

fn sorted_items(items: &HashMap<String, StoreItem>) -> Vec<StoreItem> {
    sorted_keys(items)
        .into_iter()
        .filter_map(|key| items.get(key).cloned())
        .collect()
}

/// Depth-first emission with an explicit stack; recursion depth would
/// otherwise be unbounded on large datasets.
fn sort_items_by_dependency(
    kind: DataKind,
    items: &HashMap<String, StoreItem>,
) -> Vec<StoreItem> {
    enum Frame<'a> {
        Enter(&'a str),
        Emit(&'a str),
    }

    let mut ordered = Vec::with_capacity(items.len());
    let mut emitted: HashSet<&str> = HashSet::with_capacity(items.len());
    let mut visiting: HashSet<&str> = HashSet::new();
    let mut stack: Vec<Frame> = Vec::new();

    for key in sorted_keys(items) {
        stack.push(Frame::Enter(key));
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(key) => {
                    // An item already on the visit stack means a prerequisite
                    // cycle; skip the back-edge so the sort still terminates
                    // and emits every item exactly once.
                    if emitted.contains(key) || visiting.contains(key) {
                        continue;
                    }
                    let Some(item) = items.get(key) else {
                        continue; // prerequisite not in the input set
                    };
                    visiting.insert(key);
                    stack.push(Frame::Emit(key));
                    for dep in kind.dependency_keys(item).into_iter().rev() {
                        stack.push(Frame::Enter(dep));
                    }
                }
                Frame::Emit(key) => {
                    visiting.remove(key);
                    emitted.insert(key);
                    if let Some(item) = items.get(key) {
                        ordered.push(item.clone());
                    }
                }
            }
        }
    }
    ordered
}
