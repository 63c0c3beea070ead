use async_trait::async_trait;
use soul_core::{ItemId, SnapshotCache};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Process-local snapshot cache
#[derive(Debug, Default)]
pub struct MemorySnapshotCache {
    entries: RwLock<HashMap<(String, String), HashSet<ItemId>>>,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delete(&self, category: &str, base_key: &str) -> bool {
        self.entries
            .write()
            .await
            .remove(&(category.to_string(), base_key.to_string()))
            .is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotCache for MemorySnapshotCache {
    async fn get(&self, category: &str, base_key: &str) -> soul_core::Result<Option<HashSet<ItemId>>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(category.to_string(), base_key.to_string()))
            .cloned())
    }

    async fn set(&self, category: &str, base_key: &str, ids: &HashSet<ItemId>) -> soul_core::Result<()> {
        self.entries
            .write()
            .await
            .insert((category.to_string(), base_key.to_string()), ids.clone());
        Ok(())
    }
}
