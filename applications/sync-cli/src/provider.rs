//! File-backed music provider
//!
//! Serves a provider catalog exported to JSON, so a library can be synced
//! without network access. Entries only carry source-side fields; every
//! item gets the file's provider instance as its self-mapping.
//!
//! ```json
//! {
//!   "provider": { "domain": "plex", "instance_id": "plex--home",
//!                 "features": ["library_tracks", "library_albums"] },
//!   "library": {
//!     "album": [{ "id": "al1", "name": "Blue Train" }],
//!     "track": [{ "id": "t1", "name": "Moment's Notice", "parent": "al1" }]
//!   },
//!   "album_tracks": { "al1": [{ "id": "t1", "name": "Moment's Notice" }] }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soul_core::{
    catalog, CatalogStream, MediaItem, MediaType, MusicProvider, ProviderDescriptor, SoulError,
};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{CliError, Result};

/// One source-side item in a catalog file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub favorite: bool,

    #[serde(default = "default_available")]
    pub available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_position_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_played: Option<bool>,

    /// Provider id of the containing album or podcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Catalog file layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogFile {
    pub provider: ProviderDescriptor,

    #[serde(default)]
    pub library: HashMap<MediaType, Vec<CatalogEntry>>,

    #[serde(default)]
    pub album_tracks: HashMap<String, Vec<CatalogEntry>>,

    #[serde(default)]
    pub playlist_tracks: HashMap<String, Vec<CatalogEntry>>,

    #[serde(default)]
    pub podcast_episodes: HashMap<String, Vec<CatalogEntry>>,

    /// Playlist tracks served per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// [`MusicProvider`] over a [`CatalogFile`]
#[derive(Debug)]
pub struct FileCatalogProvider {
    descriptor: ProviderDescriptor,
    library: HashMap<MediaType, Vec<MediaItem>>,
    album_tracks: HashMap<String, Vec<MediaItem>>,
    playlist_tracks: HashMap<String, Vec<MediaItem>>,
    podcast_episodes: HashMap<String, Vec<MediaItem>>,
    page_size: usize,
}

impl FileCatalogProvider {
    /// Read and validate a catalog file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let catalog: CatalogFile = serde_json::from_slice(&bytes)?;
        Self::from_catalog(catalog)
    }

    pub fn from_catalog(catalog: CatalogFile) -> Result<Self> {
        let descriptor = catalog.provider;
        if descriptor.instance_id.is_empty() || descriptor.domain.is_empty() {
            return Err(CliError::Catalog(
                "provider.domain and provider.instance_id are required".to_string(),
            ));
        }
        if catalog.page_size == 0 {
            return Err(CliError::Catalog("page_size must be at least 1".to_string()));
        }

        let library = catalog
            .library
            .into_iter()
            .map(|(media_type, entries)| {
                let items = to_items(&descriptor, media_type, entries);
                (media_type, items)
            })
            .collect();
        let album_tracks = to_children(&descriptor, MediaType::Track, catalog.album_tracks, true);
        let playlist_tracks =
            to_children(&descriptor, MediaType::Track, catalog.playlist_tracks, false);
        let podcast_episodes = to_children(
            &descriptor,
            MediaType::PodcastEpisode,
            catalog.podcast_episodes,
            true,
        );

        Ok(Self {
            descriptor,
            library,
            album_tracks,
            playlist_tracks,
            podcast_episodes,
            page_size: catalog.page_size,
        })
    }

    /// Items listed for `media_type`
    pub fn item_count(&self, media_type: MediaType) -> usize {
        self.library.get(&media_type).map_or(0, Vec::len)
    }
}

#[async_trait]
impl MusicProvider for FileCatalogProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn library_items(&self, media_type: MediaType) -> CatalogStream<'_> {
        catalog::from_items(self.library.get(&media_type).cloned().unwrap_or_default())
    }

    async fn album_tracks(&self, album_id: &str) -> soul_core::Result<Vec<MediaItem>> {
        self.album_tracks
            .get(album_id)
            .cloned()
            .ok_or_else(|| SoulError::not_found("album", album_id))
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        page: u32,
    ) -> soul_core::Result<Vec<MediaItem>> {
        let tracks = self
            .playlist_tracks
            .get(playlist_id)
            .ok_or_else(|| SoulError::not_found("playlist", playlist_id))?;
        Ok(tracks
            .chunks(self.page_size)
            .nth(page as usize)
            .map(<[MediaItem]>::to_vec)
            .unwrap_or_default())
    }

    fn podcast_episodes<'a>(&'a self, podcast_id: &'a str) -> CatalogStream<'a> {
        catalog::from_items(
            self.podcast_episodes
                .get(podcast_id)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

fn to_item(descriptor: &ProviderDescriptor, media_type: MediaType, entry: CatalogEntry) -> MediaItem {
    let mut item = MediaItem::new(
        media_type,
        entry.id,
        descriptor.domain.as_str(),
        descriptor.instance_id.as_str(),
        entry.name,
    )
    .with_available(entry.available);
    item.favorite = entry.favorite;
    item.cache_checksum = entry.checksum;
    item.resume_position_ms = entry.resume_position_ms;
    item.fully_played = entry.fully_played;
    item.parent_id = entry.parent;
    item
}

fn to_items(
    descriptor: &ProviderDescriptor,
    media_type: MediaType,
    entries: Vec<CatalogEntry>,
) -> Vec<MediaItem> {
    entries
        .into_iter()
        .map(|entry| to_item(descriptor, media_type, entry))
        .collect()
}

/// With `owned`, entries without a parent get the listing key as parent id
fn to_children(
    descriptor: &ProviderDescriptor,
    media_type: MediaType,
    listings: HashMap<String, Vec<CatalogEntry>>,
    owned: bool,
) -> HashMap<String, Vec<MediaItem>> {
    listings
        .into_iter()
        .map(|(parent_id, entries)| {
            let items = entries
                .into_iter()
                .map(|entry| {
                    let mut item = to_item(descriptor, media_type, entry);
                    if owned && item.parent_id.is_none() {
                        item.parent_id = Some(parent_id.clone());
                    }
                    item
                })
                .collect();
            (parent_id, items)
        })
        .collect()
}

fn default_available() -> bool {
    true
}

fn default_page_size() -> usize {
    50
}
