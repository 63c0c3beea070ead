//! Test helpers for sync engine integration tests
//!
//! `FakeProvider` serves scripted catalogs from memory. Tests edit the
//! catalog between passes to simulate upstream changes.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use soul_core::{
    catalog, CatalogStream, ItemId, LibraryItem, LibraryStore, MediaItem, MediaType,
    MusicProvider, ProviderDescriptor, ProviderMapping, SnapshotCache, SoulError,
};
use soul_storage::{MemoryLibrary, MemorySnapshotCache};
use soul_sync::{SyncManager, SyncSettings};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Holds the next catalog walk until released
#[derive(Clone, Default)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// In-memory provider with scripted catalogs
pub struct FakeProvider {
    descriptor: ProviderDescriptor,
    catalogs: Mutex<HashMap<MediaType, Vec<MediaItem>>>,
    fail_after: Mutex<Option<usize>>,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
    gate: Mutex<Option<Gate>>,
    album_tracks: Mutex<HashMap<String, Vec<MediaItem>>>,
    playlist_tracks: Mutex<HashMap<String, Vec<MediaItem>>>,
    episodes: Mutex<HashMap<String, Vec<MediaItem>>>,
    page_size: usize,
    pages_served: Mutex<u32>,
}

impl FakeProvider {
    /// Provider for `instance`, e.g. `plex--home`, supporting `media_types`
    pub fn new(instance: &str, media_types: &[MediaType]) -> Self {
        let descriptor = ProviderDescriptor::new(domain_of(instance), instance)
            .multi_instance(true)
            .with_features(media_types.iter().filter_map(MediaType::library_feature));
        Self {
            descriptor,
            catalogs: Mutex::new(HashMap::new()),
            fail_after: Mutex::new(None),
            cancel_at: Mutex::new(None),
            gate: Mutex::new(None),
            album_tracks: Mutex::new(HashMap::new()),
            playlist_tracks: Mutex::new(HashMap::new()),
            episodes: Mutex::new(HashMap::new()),
            page_size: 2,
            pages_served: Mutex::new(0),
        }
    }

    /// Mark the provider as streaming: its catalog is shared across instances
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.descriptor = self.descriptor.streaming(true);
        self
    }

    pub fn instance(&self) -> &str {
        &self.descriptor.instance_id
    }

    /// Replace the catalog for `media_type` with items built from `ids`
    pub fn set_catalog(&self, media_type: MediaType, ids: &[&str]) {
        let items = ids
            .iter()
            .map(|id| item(media_type, id, self.instance()))
            .collect();
        self.set_items(media_type, items);
    }

    /// Replace the catalog for `media_type`
    pub fn set_items(&self, media_type: MediaType, items: Vec<MediaItem>) {
        self.catalogs.lock().unwrap().insert(media_type, items);
    }

    /// Fail the catalog stream after `count` items
    pub fn fail_after(&self, count: Option<usize>) {
        *self.fail_after.lock().unwrap() = count;
    }

    /// Cancel `token` while yielding the item at `index`
    pub fn cancel_at(&self, index: usize, token: CancellationToken) {
        *self.cancel_at.lock().unwrap() = Some((index, token));
    }

    /// Hold the next catalog walk until `gate.release` is notified
    pub fn gate_next_walk(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_album_tracks(&self, album_id: &str, track_ids: &[&str]) {
        let tracks = track_ids
            .iter()
            .map(|id| item(MediaType::Track, id, self.instance()).with_parent(album_id))
            .collect();
        self.album_tracks
            .lock()
            .unwrap()
            .insert(album_id.to_string(), tracks);
    }

    pub fn set_playlist_tracks(&self, playlist_id: &str, track_ids: &[&str]) {
        let tracks = track_ids
            .iter()
            .map(|id| item(MediaType::Track, id, self.instance()))
            .collect();
        self.set_playlist_items(playlist_id, tracks);
    }

    pub fn set_playlist_items(&self, playlist_id: &str, tracks: Vec<MediaItem>) {
        self.playlist_tracks
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), tracks);
    }

    pub fn set_episodes(&self, podcast_id: &str, episode_ids: &[&str]) {
        let episodes = episode_ids
            .iter()
            .map(|id| item(MediaType::PodcastEpisode, id, self.instance()).with_parent(podcast_id))
            .collect();
        self.episodes
            .lock()
            .unwrap()
            .insert(podcast_id.to_string(), episodes);
    }

    /// Playlist pages fetched so far, including the terminating empty page
    pub fn pages_served(&self) -> u32 {
        *self.pages_served.lock().unwrap()
    }
}

#[async_trait]
impl MusicProvider for FakeProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn library_items(&self, media_type: MediaType) -> CatalogStream<'_> {
        let items = self
            .catalogs
            .lock()
            .unwrap()
            .get(&media_type)
            .cloned()
            .unwrap_or_default();

        let mut results: Vec<soul_core::Result<MediaItem>> = items.into_iter().map(Ok).collect();
        if let Some(count) = *self.fail_after.lock().unwrap() {
            results.truncate(count);
            results.push(Err(SoulError::provider("connection reset")));
        }

        let cancel_at = self.cancel_at.lock().unwrap().clone();
        let items = stream::iter(results.into_iter().enumerate()).map(move |(index, result)| {
            if let Some((at, token)) = &cancel_at {
                if index == *at {
                    token.cancel();
                }
            }
            result
        });

        match self.gate.lock().unwrap().take() {
            Some(gate) => stream::once(async move {
                gate.started.notify_one();
                gate.release.notified().await;
            })
            .filter_map(|()| future::ready(None::<soul_core::Result<MediaItem>>))
            .chain(items)
            .boxed(),
            None => items.boxed(),
        }
    }

    async fn album_tracks(&self, album_id: &str) -> soul_core::Result<Vec<MediaItem>> {
        self.album_tracks
            .lock()
            .unwrap()
            .get(album_id)
            .cloned()
            .ok_or_else(|| SoulError::not_found("album", album_id))
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        page: u32,
    ) -> soul_core::Result<Vec<MediaItem>> {
        *self.pages_served.lock().unwrap() += 1;
        let tracks = self
            .playlist_tracks
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .unwrap_or_default();
        Ok(tracks
            .chunks(self.page_size)
            .nth(page as usize)
            .map(<[MediaItem]>::to_vec)
            .unwrap_or_default())
    }

    fn podcast_episodes<'a>(&'a self, podcast_id: &'a str) -> CatalogStream<'a> {
        let episodes = self
            .episodes
            .lock()
            .unwrap()
            .get(podcast_id)
            .cloned()
            .unwrap_or_default();
        catalog::from_items(episodes)
    }
}

/// Provider that only lists library catalogs; child listings use the
/// trait defaults
pub struct CatalogOnlyProvider {
    descriptor: ProviderDescriptor,
    items: Vec<MediaItem>,
}

impl CatalogOnlyProvider {
    pub fn new(instance: &str, items: Vec<MediaItem>) -> Self {
        let descriptor = ProviderDescriptor::new(domain_of(instance), instance)
            .multi_instance(true)
            .with_features(items.iter().filter_map(|item| item.media_type.library_feature()));
        Self { descriptor, items }
    }
}

impl MusicProvider for CatalogOnlyProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn library_items(&self, media_type: MediaType) -> CatalogStream<'_> {
        catalog::from_items(
            self.items
                .iter()
                .filter(|item| item.media_type == media_type)
                .cloned()
                .collect(),
        )
    }
}

/// Library, snapshot cache and manager wired together
pub struct Harness {
    pub library: Arc<MemoryLibrary>,
    pub snapshots: Arc<MemorySnapshotCache>,
    pub manager: SyncManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SyncSettings::default())
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        Self::build(settings, CancellationToken::new())
    }

    /// Harness whose manager is cancelled through `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self::build(SyncSettings::default(), token)
    }

    fn build(settings: SyncSettings, token: CancellationToken) -> Self {
        let library = Arc::new(MemoryLibrary::new());
        let snapshots = Arc::new(MemorySnapshotCache::new());
        let manager = SyncManager::new(library.clone(), snapshots.clone(), settings)
            .with_cancellation(token);
        Self {
            library,
            snapshots,
            manager,
        }
    }

    /// Library entity mapped to (`instance`, `item_id`)
    pub async fn entity(
        &self,
        media_type: MediaType,
        item_id: &str,
        instance: &str,
    ) -> Option<LibraryItem> {
        let probe = item(media_type, item_id, instance);
        self.library
            .lookup_by_mapping(media_type, &probe.provider_mappings, instance)
            .await
            .expect("Library lookup failed")
    }

    /// Id of the entity mapped to (`instance`, `item_id`); panics if absent
    pub async fn id_of(&self, media_type: MediaType, item_id: &str, instance: &str) -> ItemId {
        self.entity(media_type, item_id, instance)
            .await
            .unwrap_or_else(|| panic!("No entity for {instance}/{item_id}"))
            .id
    }

    pub async fn snapshot(&self, media_type: MediaType, instance: &str) -> Option<HashSet<ItemId>> {
        self.snapshots
            .get(media_type.as_str(), instance)
            .await
            .expect("Snapshot read failed")
    }
}

/// Library store that fails every call naming one provider item id
pub struct FailingStore {
    pub inner: Arc<MemoryLibrary>,
    item_id: String,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryLibrary>, item_id: &str) -> Self {
        Self {
            inner,
            item_id: item_id.to_string(),
        }
    }

    fn check(&self, item_id: &str) -> soul_core::Result<()> {
        if item_id == self.item_id {
            return Err(SoulError::storage(format!("write failed for {item_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for FailingStore {
    async fn lookup_by_mapping(
        &self,
        media_type: MediaType,
        mappings: &[ProviderMapping],
        lookup_key: &str,
    ) -> soul_core::Result<Option<LibraryItem>> {
        for mapping in mappings {
            self.check(&mapping.item_id)?;
        }
        self.inner.lookup_by_mapping(media_type, mappings, lookup_key).await
    }

    async fn add(&self, item: MediaItem) -> soul_core::Result<LibraryItem> {
        self.check(&item.item_id)?;
        self.inner.add(item).await
    }

    async fn update(&self, id: ItemId, item: MediaItem) -> soul_core::Result<LibraryItem> {
        self.check(&item.item_id)?;
        self.inner.update(id, item).await
    }

    async fn remove(&self, id: ItemId, recursive: bool) -> soul_core::Result<()> {
        self.inner.remove(id, recursive).await
    }

    async fn set_favorite(&self, id: ItemId, favorite: bool) -> soul_core::Result<()> {
        self.inner.set_favorite(id, favorite).await
    }

    async fn set_provider_mappings(
        &self,
        id: ItemId,
        mappings: Vec<ProviderMapping>,
    ) -> soul_core::Result<()> {
        self.inner.set_provider_mappings(id, mappings).await
    }

    async fn get(&self, id: ItemId) -> soul_core::Result<LibraryItem> {
        self.inner.get(id).await
    }
}

pub fn domain_of(instance: &str) -> &str {
    instance.split("--").next().unwrap_or(instance)
}

/// Provider item with a single self-mapping
pub fn item(media_type: MediaType, item_id: &str, instance: &str) -> MediaItem {
    MediaItem::new(
        media_type,
        item_id,
        domain_of(instance),
        instance,
        format!("{media_type} {item_id}"),
    )
}

/// Item whose mapping names a different item id than the item itself
pub fn mismatched_item(media_type: MediaType, item_id: &str, instance: &str) -> MediaItem {
    let mut item = item(media_type, item_id, instance);
    item.provider_mappings[0].item_id = format!("{item_id}-stale");
    item
}
