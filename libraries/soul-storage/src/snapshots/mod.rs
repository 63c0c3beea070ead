//! Sync snapshot caches
//!
//! A snapshot is the set of library ids observed by the last completed sync
//! pass of one provider instance for one media type. Entries are keyed by
//! category (media type name) and base key (provider instance id).

mod memory;
mod sqlite;

pub use memory::MemorySnapshotCache;
pub use sqlite::SqliteSnapshotCache;

use soul_core::ItemId;
use std::collections::HashSet;

/// Stored ids, sorted so the encoding is stable
fn encode(ids: &HashSet<ItemId>) -> crate::error::Result<String> {
    let mut sorted: Vec<ItemId> = ids.iter().copied().collect();
    sorted.sort_unstable();
    Ok(serde_json::to_string(&sorted)?)
}

fn decode(data: &str) -> crate::error::Result<HashSet<ItemId>> {
    let ids: Vec<ItemId> = serde_json::from_str(data)?;
    Ok(ids.into_iter().collect())
}
