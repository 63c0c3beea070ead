/// Sync engine configuration
use serde::{Deserialize, Serialize};
use soul_core::MediaItem;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Sync every track of a library album
    #[serde(default)]
    pub import_album_tracks: bool,

    /// Playlist names or URIs whose member tracks are synced
    #[serde(default)]
    pub import_playlist_tracks: Vec<String>,

    #[serde(default = "default_sync_podcast_episodes")]
    pub sync_podcast_episodes: bool,

    /// Passes of one provider that may run at the same time
    #[serde(default = "default_max_concurrent_passes")]
    pub max_concurrent_passes: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            import_album_tracks: false,
            import_playlist_tracks: Vec::new(),
            sync_podcast_episodes: default_sync_podcast_episodes(),
            max_concurrent_passes: default_max_concurrent_passes(),
        }
    }
}

impl SyncSettings {
    /// Whether member tracks of `playlist` should be synced
    pub fn playlist_tracks_allowed(&self, playlist: &MediaItem) -> bool {
        if self.import_playlist_tracks.is_empty() {
            return false;
        }
        let uri = playlist.uri();
        self.import_playlist_tracks
            .iter()
            .any(|entry| *entry == playlist.name || *entry == uri)
    }
}

fn default_sync_podcast_episodes() -> bool {
    true
}

fn default_max_concurrent_passes() -> usize {
    2
}
