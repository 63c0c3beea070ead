//! Media type tags
//!
//! Every canonical library entity and every provider-shaped item carries one
//! of these tags. The tag also names the snapshot category of a sync pass.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::features::ProviderFeature;

/// Kind of media object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Artist,
    Album,
    Track,
    Playlist,
    Radio,
    Audiobook,
    Podcast,
    PodcastEpisode,
}

impl MediaType {
    /// Media types that can be synced as a provider library
    pub const LIBRARY: [MediaType; 7] = [
        MediaType::Artist,
        MediaType::Album,
        MediaType::Track,
        MediaType::Playlist,
        MediaType::Radio,
        MediaType::Audiobook,
        MediaType::Podcast,
    ];

    /// Stable name, used as the snapshot cache category
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Track => "track",
            Self::Playlist => "playlist",
            Self::Radio => "radio",
            Self::Audiobook => "audiobook",
            Self::Podcast => "podcast",
            Self::PodcastEpisode => "podcast_episode",
        }
    }

    /// Parse from the stable name
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "artist" => Some(Self::Artist),
            "album" => Some(Self::Album),
            "track" => Some(Self::Track),
            "playlist" => Some(Self::Playlist),
            "radio" => Some(Self::Radio),
            "audiobook" => Some(Self::Audiobook),
            "podcast" => Some(Self::Podcast),
            "podcast_episode" => Some(Self::PodcastEpisode),
            _ => None,
        }
    }

    /// Feature a provider must declare to expose a library of this type
    #[must_use]
    pub fn library_feature(&self) -> Option<ProviderFeature> {
        match self {
            Self::Artist => Some(ProviderFeature::LibraryArtists),
            Self::Album => Some(ProviderFeature::LibraryAlbums),
            Self::Track => Some(ProviderFeature::LibraryTracks),
            Self::Playlist => Some(ProviderFeature::LibraryPlaylists),
            Self::Radio => Some(ProviderFeature::LibraryRadios),
            Self::Audiobook => Some(ProviderFeature::LibraryAudiobooks),
            Self::Podcast => Some(ProviderFeature::LibraryPodcasts),
            Self::PodcastEpisode => None,
        }
    }

    /// Feature a provider must declare to accept library add/remove for this type
    #[must_use]
    pub fn library_edit_feature(&self) -> Option<ProviderFeature> {
        match self {
            Self::Artist => Some(ProviderFeature::LibraryArtistsEdit),
            Self::Album => Some(ProviderFeature::LibraryAlbumsEdit),
            Self::Track => Some(ProviderFeature::LibraryTracksEdit),
            Self::Playlist => Some(ProviderFeature::LibraryPlaylistsEdit),
            Self::Radio => Some(ProviderFeature::LibraryRadiosEdit),
            Self::Audiobook => Some(ProviderFeature::LibraryAudiobooksEdit),
            Self::Podcast => Some(ProviderFeature::LibraryPodcastsEdit),
            Self::PodcastEpisode => None,
        }
    }

    /// Type of the entity that owns items of this type, if any
    #[must_use]
    pub fn parent_type(&self) -> Option<MediaType> {
        match self {
            Self::Track => Some(Self::Album),
            Self::PodcastEpisode => Some(Self::Podcast),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
