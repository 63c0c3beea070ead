//! In-memory canonical library
//!
//! Every mutation takes the write lock for its whole read-modify-write, so
//! concurrent passes touching the same entity never interleave. The library
//! can be saved to and loaded from a JSON file.
//!
//! # Example
//!
//! ```rust,no_run
//! use soul_storage::MemoryLibrary;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let library = MemoryLibrary::open("library.json").await?;
//! // ... run sync passes against it ...
//! library.save("library.json").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soul_core::{
    upsert_mapping, ItemId, LibraryItem, LibraryStore, MediaItem, MediaType, ProviderMapping,
    SoulError,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Default)]
struct LibraryState {
    next_id: i64,
    items: BTreeMap<ItemId, LibraryItem>,
    index: MappingIndex,
    /// Item id -> playlists containing it
    playlist_refs: HashMap<ItemId, HashSet<ItemId>>,
}

/// (media type, instance or domain, item id)
type MappingKey = (MediaType, String, String);

/// Mapping lookups without scanning every entity
///
/// Sets keep the lowest id first, so lookups stay deterministic when two
/// entities share a key.
#[derive(Debug, Default)]
struct MappingIndex {
    by_instance: HashMap<MappingKey, BTreeSet<ItemId>>,
    by_domain: HashMap<MappingKey, BTreeSet<ItemId>>,
}

impl MappingIndex {
    fn insert(&mut self, entity: &LibraryItem) {
        for m in &entity.provider_mappings {
            self.by_instance
                .entry((entity.media_type, m.provider_instance.clone(), m.item_id.clone()))
                .or_default()
                .insert(entity.id);
            self.by_domain
                .entry((entity.media_type, m.provider_domain.clone(), m.item_id.clone()))
                .or_default()
                .insert(entity.id);
        }
    }

    fn remove(&mut self, entity: &LibraryItem) {
        for m in &entity.provider_mappings {
            unlink(
                &mut self.by_instance,
                (entity.media_type, m.provider_instance.clone(), m.item_id.clone()),
                entity.id,
            );
            unlink(
                &mut self.by_domain,
                (entity.media_type, m.provider_domain.clone(), m.item_id.clone()),
                entity.id,
            );
        }
    }

    fn by_instance(&self, media_type: MediaType, instance: &str, item_id: &str) -> Option<ItemId> {
        first(&self.by_instance, media_type, instance, item_id)
    }

    fn by_domain(&self, media_type: MediaType, domain: &str, item_id: &str) -> Option<ItemId> {
        first(&self.by_domain, media_type, domain, item_id)
    }
}

fn unlink(map: &mut HashMap<MappingKey, BTreeSet<ItemId>>, key: MappingKey, id: ItemId) {
    if let Some(ids) = map.get_mut(&key) {
        ids.remove(&id);
        if ids.is_empty() {
            map.remove(&key);
        }
    }
}

fn first(
    map: &HashMap<MappingKey, BTreeSet<ItemId>>,
    media_type: MediaType,
    provider: &str,
    item_id: &str,
) -> Option<ItemId> {
    map.get(&(media_type, provider.to_string(), item_id.to_string()))
        .and_then(|ids| ids.first().copied())
}

#[derive(Serialize, Deserialize)]
struct LibraryFile {
    next_id: i64,
    items: Vec<LibraryItem>,
    #[serde(default)]
    playlist_refs: Vec<PlaylistRef>,
}

#[derive(Serialize, Deserialize)]
struct PlaylistRef {
    playlist: ItemId,
    item: ItemId,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl LibraryState {
    fn find_by_instance(
        &self,
        media_type: MediaType,
        provider_instance: &str,
        item_id: &str,
    ) -> Option<&LibraryItem> {
        self.index
            .by_instance(media_type, provider_instance, item_id)
            .and_then(|id| self.items.get(&id))
    }

    fn lookup(
        &self,
        media_type: MediaType,
        mappings: &[ProviderMapping],
        lookup_key: &str,
    ) -> Option<&LibraryItem> {
        mappings
            .iter()
            .find_map(|m| self.find_by_instance(media_type, &m.provider_instance, &m.item_id))
            .or_else(|| {
                // Only shared catalogs resolve across instances
                mappings
                    .iter()
                    .filter(|m| m.provider_domain == lookup_key)
                    .find_map(|m| self.index.by_domain(media_type, &m.provider_domain, &m.item_id))
                    .and_then(|id| self.items.get(&id))
            })
    }

    fn resolve_parent(&self, item: &MediaItem) -> Option<ItemId> {
        let parent_type = item.media_type.parent_type()?;
        let parent_id = item.parent_id.as_deref()?;
        self.find_by_instance(parent_type, &item.provider, parent_id)
            .map(|parent| parent.id)
    }

    fn is_referenced(&self, id: ItemId) -> bool {
        self.playlist_refs.get(&id).is_some_and(|refs| !refs.is_empty())
    }

    fn insert(&mut self, item: MediaItem) -> LibraryItem {
        self.next_id += 1;
        let id = ItemId::new(self.next_id);
        let parent = self.resolve_parent(&item);
        let resume = item.resume_state();
        let mut mappings = Vec::with_capacity(item.provider_mappings.len());
        for mapping in item.provider_mappings {
            upsert_mapping(&mut mappings, mapping);
        }

        let timestamp = now();
        let entity = LibraryItem {
            id,
            media_type: item.media_type,
            name: item.name,
            favorite: item.favorite,
            provider_mappings: mappings,
            cache_checksum: item.cache_checksum,
            resume,
            parent,
            added_at: timestamp,
            updated_at: timestamp,
        };
        self.index.insert(&entity);
        self.items.insert(id, entity.clone());
        entity
    }

    fn merge(&mut self, id: ItemId, item: MediaItem) -> soul_core::Result<LibraryItem> {
        let parent = self.resolve_parent(&item);
        let resume = item.resume_state();
        let entity = self
            .items
            .get_mut(&id)
            .ok_or_else(|| SoulError::item_not_found(id))?;
        self.index.remove(entity);

        entity.name = item.name;
        // Favourites are only ever cleared through set_favorite
        entity.favorite |= item.favorite;
        for mapping in item.provider_mappings {
            upsert_mapping(&mut entity.provider_mappings, mapping);
        }
        if item.cache_checksum.is_some() {
            entity.cache_checksum = item.cache_checksum;
        }
        if resume.is_some() {
            entity.resume = resume;
        }
        if parent.is_some() {
            entity.parent = parent;
        }
        entity.updated_at = now();
        self.index.insert(entity);
        Ok(entity.clone())
    }

    fn remove_entry(&mut self, id: ItemId) {
        if let Some(entity) = self.items.remove(&id) {
            self.index.remove(&entity);
        }
        self.playlist_refs.remove(&id);
        for refs in self.playlist_refs.values_mut() {
            refs.remove(&id);
        }
        self.playlist_refs.retain(|_, refs| !refs.is_empty());
    }
}

/// In-memory implementation of [`LibraryStore`]
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    state: RwLock<LibraryState>,
    mutations: AtomicU64,
}

impl MemoryLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists, otherwise start empty
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            debug!("No library file at {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Load a library previously written by [`MemoryLibrary::save`]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let file: LibraryFile = serde_json::from_slice(&bytes)?;

        let mut state = LibraryState {
            next_id: file.next_id,
            ..LibraryState::default()
        };
        for item in file.items {
            state.next_id = state.next_id.max(item.id.as_i64());
            state.index.insert(&item);
            state.items.insert(item.id, item);
        }
        for reference in file.playlist_refs {
            state
                .playlist_refs
                .entry(reference.item)
                .or_default()
                .insert(reference.playlist);
        }

        debug!(
            "Loaded {} library items from {}",
            state.items.len(),
            path.as_ref().display()
        );
        Ok(Self {
            state: RwLock::new(state),
            mutations: AtomicU64::new(0),
        })
    }

    /// Write the library as JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = {
            let state = self.state.read().await;
            let mut playlist_refs: Vec<PlaylistRef> = state
                .playlist_refs
                .iter()
                .flat_map(|(item, playlists)| {
                    playlists.iter().map(|playlist| PlaylistRef {
                        playlist: *playlist,
                        item: *item,
                    })
                })
                .collect();
            playlist_refs.sort_by_key(|r| (r.item, r.playlist));

            let file = LibraryFile {
                next_id: state.next_id,
                items: state.items.values().cloned().collect(),
                playlist_refs,
            };
            serde_json::to_vec_pretty(&file)?
        };
        tokio::fs::write(path.as_ref(), bytes).await?;
        Ok(())
    }

    /// Record that `playlist` contains `item`
    ///
    /// A referenced item cannot be removed until the reference is dropped.
    pub async fn add_playlist_reference(
        &self,
        playlist: ItemId,
        item: ItemId,
    ) -> soul_core::Result<()> {
        let mut state = self.state.write().await;
        match state.items.get(&playlist) {
            Some(entity) if entity.media_type == MediaType::Playlist => {}
            Some(_) => {
                return Err(SoulError::InvalidInput(format!("{playlist} is not a playlist")))
            }
            None => return Err(SoulError::item_not_found(playlist)),
        }
        if !state.items.contains_key(&item) {
            return Err(SoulError::item_not_found(item));
        }
        state.playlist_refs.entry(item).or_default().insert(playlist);
        Ok(())
    }

    pub async fn remove_playlist_reference(&self, playlist: ItemId, item: ItemId) {
        let mut state = self.state.write().await;
        if let Some(refs) = state.playlist_refs.get_mut(&item) {
            refs.remove(&playlist);
            if refs.is_empty() {
                state.playlist_refs.remove(&item);
            }
        }
    }

    /// Every entity of `media_type`, by id
    pub async fn items(&self, media_type: MediaType) -> Vec<LibraryItem> {
        self.state
            .read()
            .await
            .items
            .values()
            .filter(|item| item.media_type == media_type)
            .cloned()
            .collect()
    }

    /// Entities whose parent is `id`
    pub async fn children(&self, id: ItemId) -> Vec<LibraryItem> {
        self.state
            .read()
            .await
            .items
            .values()
            .filter(|item| item.parent == Some(id))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    /// Mutating store calls served so far
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LibraryStore for MemoryLibrary {
    async fn lookup_by_mapping(
        &self,
        media_type: MediaType,
        mappings: &[ProviderMapping],
        lookup_key: &str,
    ) -> soul_core::Result<Option<LibraryItem>> {
        Ok(self
            .state
            .read()
            .await
            .lookup(media_type, mappings, lookup_key)
            .cloned())
    }

    async fn add(&self, item: MediaItem) -> soul_core::Result<LibraryItem> {
        self.record_mutation();
        let mut state = self.state.write().await;

        // An existing (instance, item id) match is merged rather than duplicated
        let existing = item.provider_mappings.iter().find_map(|m| {
            state
                .find_by_instance(item.media_type, &m.provider_instance, &m.item_id)
                .map(|entity| entity.id)
        });
        match existing {
            Some(id) => {
                debug!(%id, uri = %item.uri(), "Merging add into existing library item");
                state.merge(id, item)
            }
            None => Ok(state.insert(item)),
        }
    }

    async fn update(&self, id: ItemId, item: MediaItem) -> soul_core::Result<LibraryItem> {
        self.record_mutation();
        self.state.write().await.merge(id, item)
    }

    async fn remove(&self, id: ItemId, recursive: bool) -> soul_core::Result<()> {
        self.record_mutation();
        let mut state = self.state.write().await;

        let media_type = state
            .items
            .get(&id)
            .map(|item| item.media_type)
            .ok_or_else(|| SoulError::item_not_found(id))?;

        if let Some(refs) = state.playlist_refs.get(&id).filter(|refs| !refs.is_empty()) {
            return Err(SoulError::has_dependents(
                id,
                format!("referenced by {} playlist(s)", refs.len()),
            ));
        }

        let children: Vec<ItemId> = state
            .items
            .values()
            .filter(|item| item.parent == Some(id))
            .map(|item| item.id)
            .collect();
        // Episodes never outlive their podcast
        let cascade = recursive || media_type == MediaType::Podcast;
        if !children.is_empty() && !cascade {
            return Err(SoulError::has_dependents(
                id,
                format!("owns {} child item(s)", children.len()),
            ));
        }

        for child in children {
            let keep = state.is_referenced(child)
                || state
                    .items
                    .get(&child)
                    .is_some_and(LibraryItem::in_any_library);
            if keep {
                if let Some(entity) = state.items.get_mut(&child) {
                    entity.parent = None;
                }
            } else {
                state.remove_entry(child);
            }
        }

        state.remove_entry(id);
        Ok(())
    }

    async fn set_favorite(&self, id: ItemId, favorite: bool) -> soul_core::Result<()> {
        self.record_mutation();
        let mut state = self.state.write().await;
        let entity = state
            .items
            .get_mut(&id)
            .ok_or_else(|| SoulError::item_not_found(id))?;
        entity.favorite = favorite;
        entity.updated_at = now();
        Ok(())
    }

    async fn set_provider_mappings(
        &self,
        id: ItemId,
        mappings: Vec<ProviderMapping>,
    ) -> soul_core::Result<()> {
        self.record_mutation();
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let entity = state
            .items
            .get_mut(&id)
            .ok_or_else(|| SoulError::item_not_found(id))?;

        let mut deduped = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            upsert_mapping(&mut deduped, mapping);
        }
        state.index.remove(entity);
        entity.provider_mappings = deduped;
        entity.updated_at = now();
        state.index.insert(entity);
        Ok(())
    }

    async fn get(&self, id: ItemId) -> soul_core::Result<LibraryItem> {
        self.state
            .read()
            .await
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| SoulError::item_not_found(id))
    }

    async fn set_mapping_in_library(
        &self,
        id: ItemId,
        provider_instance: &str,
        in_library: bool,
    ) -> soul_core::Result<()> {
        self.record_mutation();
        let mut state = self.state.write().await;
        let entity = state
            .items
            .get_mut(&id)
            .ok_or_else(|| SoulError::item_not_found(id))?;
        for mapping in entity
            .provider_mappings
            .iter_mut()
            .filter(|m| m.provider_instance == provider_instance)
        {
            mapping.in_library = in_library;
        }
        entity.updated_at = now();
        Ok(())
    }
}
