//! Storage traits for the canonical library and sync snapshots

use crate::error::Result;
use crate::types::{ItemId, LibraryItem, MediaItem, MediaType, ProviderMapping};
use async_trait::async_trait;
use std::collections::HashSet;

/// Canonical library store
///
/// The store is the single source of truth for canonical entities. It must
/// serialize concurrent mutations of the same entity id, since passes for
/// different providers may touch one entity at the same time.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Find the entity any of `mappings` already points at
    ///
    /// Matches on (provider instance, item id) first. When `lookup_key` is
    /// the domain of a mapping (see [`ProviderDescriptor::lookup_key`]), that
    /// mapping also matches on (provider domain, item id), so instances of a
    /// shared catalog resolve to one entity. Private catalogs never match
    /// across instances.
    ///
    /// [`ProviderDescriptor::lookup_key`]: crate::ProviderDescriptor::lookup_key
    async fn lookup_by_mapping(
        &self,
        media_type: MediaType,
        mappings: &[ProviderMapping],
        lookup_key: &str,
    ) -> Result<Option<LibraryItem>>;

    /// Create a canonical entity from a provider item
    async fn add(&self, item: MediaItem) -> Result<LibraryItem>;

    /// Merge a provider item into an existing entity
    ///
    /// # Errors
    /// Returns `NotFound` if the entity is gone
    async fn update(&self, id: ItemId, item: MediaItem) -> Result<LibraryItem>;

    /// Delete an entity; `recursive` also deletes owned children
    ///
    /// # Errors
    /// Returns `HasDependents` if other entities still reference it
    async fn remove(&self, id: ItemId, recursive: bool) -> Result<()>;

    async fn set_favorite(&self, id: ItemId, favorite: bool) -> Result<()>;

    /// Replace the entity's whole mapping set
    async fn set_provider_mappings(&self, id: ItemId, mappings: Vec<ProviderMapping>)
        -> Result<()>;

    /// # Errors
    /// Returns `NotFound` if the entity does not exist
    async fn get(&self, id: ItemId) -> Result<LibraryItem>;

    /// Flip `in_library` on every mapping owned by `provider_instance`
    ///
    /// Mappings of other instances are left alone. The default reads the
    /// entity and writes the full mapping set back; stores with finer
    /// grained locking should override it.
    async fn set_mapping_in_library(
        &self,
        id: ItemId,
        provider_instance: &str,
        in_library: bool,
    ) -> Result<()> {
        let mut item = self.get(id).await?;
        let mut changed = false;
        for mapping in item
            .provider_mappings
            .iter_mut()
            .filter(|m| m.provider_instance == provider_instance)
        {
            if mapping.in_library != in_library {
                mapping.in_library = in_library;
                changed = true;
            }
        }
        if changed {
            self.set_provider_mappings(id, item.provider_mappings).await?;
        }
        Ok(())
    }
}

/// Durable store of the ids observed by the last completed pass
///
/// Keyed by category (media type name) and base key (provider instance id).
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    async fn get(&self, category: &str, base_key: &str) -> Result<Option<HashSet<ItemId>>>;

    async fn set(&self, category: &str, base_key: &str, ids: &HashSet<ItemId>) -> Result<()>;
}
