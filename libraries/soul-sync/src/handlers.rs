//! Per-media-type sync handlers
//!
//! The reconciler runs the same loop for every media type. What differs per
//! type (whether a new item is admitted, what counts as an upstream change,
//! which children are pulled along) lives behind [`SyncHandler`], looked up
//! once per pass from a [`HandlerTable`].

use async_trait::async_trait;
use soul_core::{catalog, LibraryItem, MediaItem, MediaType};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::reconciler::{sync_children, SyncContext};
use crate::types::ReconcileStats;

/// Type-specific behaviour of a sync pass
#[async_trait]
pub trait SyncHandler: Debug + Send + Sync {
    /// Whether an item with no library entity yet should be created
    fn admit_new(&self, item: &MediaItem) -> bool {
        let _ = item;
        true
    }

    /// Upstream change the generic mapping check would not notice
    fn has_changed(&self, existing: &LibraryItem, item: &MediaItem) -> bool {
        let _ = (existing, item);
        false
    }

    /// Pull children of a committed parent into the library
    ///
    /// Child failures must be logged and counted, never returned.
    async fn sync_children(
        &self,
        ctx: &SyncContext<'_>,
        parent: &LibraryItem,
        item: &MediaItem,
        stats: &mut ReconcileStats,
    ) {
        let _ = (ctx, parent, item, stats);
    }
}

/// Artists and radios: mapping check only
#[derive(Debug, Default)]
pub struct DefaultHandler;

impl SyncHandler for DefaultHandler {}

/// Albums, optionally pulling in every album track
#[derive(Debug, Default)]
pub struct AlbumHandler;

#[async_trait]
impl SyncHandler for AlbumHandler {
    async fn sync_children(
        &self,
        ctx: &SyncContext<'_>,
        _parent: &LibraryItem,
        item: &MediaItem,
        stats: &mut ReconcileStats,
    ) {
        if !ctx.settings.import_album_tracks {
            return;
        }
        match ctx.provider.album_tracks(&item.item_id).await {
            Ok(tracks) => sync_children(ctx, item, catalog::from_items(tracks), stats).await,
            Err(e) if e.is_unsupported() => {
                debug!(uri = %item.uri(), error = %e, "Provider lists no album tracks");
            }
            Err(e) => {
                stats.children_failed += 1;
                warn!(uri = %item.uri(), error = %e, "Failed to fetch album tracks");
            }
        }
    }
}

/// Tracks: unavailable new tracks are skipped, availability flips update
#[derive(Debug, Default)]
pub struct TrackHandler;

impl SyncHandler for TrackHandler {
    fn admit_new(&self, item: &MediaItem) -> bool {
        item.available()
    }

    fn has_changed(&self, existing: &LibraryItem, item: &MediaItem) -> bool {
        availability_changed(existing, item)
    }
}

/// Playlists: checksum comparison, member tracks for allow-listed playlists
#[derive(Debug, Default)]
pub struct PlaylistHandler;

#[async_trait]
impl SyncHandler for PlaylistHandler {
    fn has_changed(&self, existing: &LibraryItem, item: &MediaItem) -> bool {
        item.cache_checksum.is_some() && existing.cache_checksum != item.cache_checksum
    }

    async fn sync_children(
        &self,
        ctx: &SyncContext<'_>,
        _parent: &LibraryItem,
        item: &MediaItem,
        stats: &mut ReconcileStats,
    ) {
        if !ctx.settings.playlist_tracks_allowed(item) {
            return;
        }
        debug!(uri = %item.uri(), "Syncing playlist tracks");
        sync_children(ctx, item, ctx.provider.playlist_tracks(&item.item_id), stats).await;
    }
}

/// Podcasts: availability flips update, episodes follow
#[derive(Debug, Default)]
pub struct PodcastHandler;

#[async_trait]
impl SyncHandler for PodcastHandler {
    fn has_changed(&self, existing: &LibraryItem, item: &MediaItem) -> bool {
        availability_changed(existing, item)
    }

    async fn sync_children(
        &self,
        ctx: &SyncContext<'_>,
        _parent: &LibraryItem,
        item: &MediaItem,
        stats: &mut ReconcileStats,
    ) {
        if !ctx.settings.sync_podcast_episodes {
            return;
        }
        sync_children(ctx, item, ctx.provider.podcast_episodes(&item.item_id), stats).await;
    }
}

/// Audiobooks and podcast episodes: resume position and fully-played
#[derive(Debug, Default)]
pub struct ResumeHandler;

impl SyncHandler for ResumeHandler {
    fn has_changed(&self, existing: &LibraryItem, item: &MediaItem) -> bool {
        match item.resume_state() {
            Some(observed) => existing.resume != Some(observed),
            None => false,
        }
    }
}

fn availability_changed(existing: &LibraryItem, item: &MediaItem) -> bool {
    match existing.mapping(&item.provider, &item.item_id) {
        Some(mapping) => mapping.available != item.available(),
        None => true,
    }
}

/// Handler lookup keyed by media type
#[derive(Debug, Clone)]
pub struct HandlerTable {
    handlers: HashMap<MediaType, Arc<dyn SyncHandler>>,
    fallback: Arc<dyn SyncHandler>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl HandlerTable {
    /// Table with no registrations; every type uses [`DefaultHandler`]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(DefaultHandler),
        }
    }

    /// Table with the built-in handler for every media type
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(MediaType::Artist, Arc::new(DefaultHandler));
        table.register(MediaType::Radio, Arc::new(DefaultHandler));
        table.register(MediaType::Album, Arc::new(AlbumHandler));
        table.register(MediaType::Track, Arc::new(TrackHandler));
        table.register(MediaType::Playlist, Arc::new(PlaylistHandler));
        table.register(MediaType::Podcast, Arc::new(PodcastHandler));
        table.register(MediaType::Audiobook, Arc::new(ResumeHandler));
        table.register(MediaType::PodcastEpisode, Arc::new(ResumeHandler));
        table
    }

    /// Register or replace the handler for `media_type`
    pub fn register(&mut self, media_type: MediaType, handler: Arc<dyn SyncHandler>) {
        self.handlers.insert(media_type, handler);
    }

    pub fn get(&self, media_type: MediaType) -> &dyn SyncHandler {
        self.handlers
            .get(&media_type)
            .unwrap_or(&self.fallback)
            .as_ref()
    }
}
