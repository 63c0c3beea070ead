/// Provider-side contract consumed by the sync engine
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::catalog::{paginate, CatalogStream};
use crate::error::{Result, SoulError};
use crate::types::{MediaItem, MediaType, ProviderDescriptor};

/// A configured music provider instance
///
/// Implementations wrap one external source (streaming service, media
/// server, radio directory) and expose its library as lazy catalogs.
/// Every yielded item must carry exactly one mapping: the provider's own
/// (instance id, item id).
#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// Identity and declared features
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Convenience accessor for the instance id
    fn instance_id(&self) -> &str {
        &self.descriptor().instance_id
    }

    /// Library catalog for `media_type`
    ///
    /// Only called for media types the descriptor declares library support
    /// for. An unrecoverable source error must be yielded as an `Err` item,
    /// which ends the stream.
    fn library_items(&self, media_type: MediaType) -> CatalogStream<'_>;

    /// Full track listing of an album
    ///
    /// # Errors
    /// Returns `UnsupportedFeature` unless overridden
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<MediaItem>> {
        let _ = album_id;
        Err(SoulError::unsupported("album tracks"))
    }

    /// One page of a playlist's tracks; an empty page marks the end
    ///
    /// # Errors
    /// Returns `UnsupportedFeature` unless overridden
    async fn playlist_tracks_page(&self, playlist_id: &str, page: u32) -> Result<Vec<MediaItem>> {
        let _ = (playlist_id, page);
        Err(SoulError::unsupported("playlist tracks"))
    }

    /// All tracks of a playlist, paged through `playlist_tracks_page`
    fn playlist_tracks<'a>(&'a self, playlist_id: &'a str) -> CatalogStream<'a> {
        paginate(move |page| self.playlist_tracks_page(playlist_id, page))
    }

    /// Episodes of a podcast
    fn podcast_episodes<'a>(&'a self, podcast_id: &'a str) -> CatalogStream<'a> {
        let _ = podcast_id;
        stream::once(async { Err(SoulError::unsupported("podcast episodes")) }).boxed()
    }
}
