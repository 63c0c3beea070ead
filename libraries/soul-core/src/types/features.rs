//! Provider capability flags
//!
//! A provider instance declares a fixed set of features. The set is stored as
//! a bitset so membership tests are a single mask operation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single capability a provider may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProviderFeature {
    LibraryArtists = 0,
    LibraryAlbums,
    LibraryTracks,
    LibraryPlaylists,
    LibraryRadios,
    LibraryAudiobooks,
    LibraryPodcasts,
    LibraryArtistsEdit,
    LibraryAlbumsEdit,
    LibraryTracksEdit,
    LibraryPlaylistsEdit,
    LibraryRadiosEdit,
    LibraryAudiobooksEdit,
    LibraryPodcastsEdit,
    /// Consulted by playlist write paths, not by library sync
    PlaylistTracksEdit,
    /// Consulted by playlist write paths, not by library sync
    PlaylistCreate,
    Search,
    SimilarTracks,
    Recommendations,
}

impl ProviderFeature {
    /// Every known feature, in bit order
    pub const ALL: [ProviderFeature; 19] = [
        Self::LibraryArtists,
        Self::LibraryAlbums,
        Self::LibraryTracks,
        Self::LibraryPlaylists,
        Self::LibraryRadios,
        Self::LibraryAudiobooks,
        Self::LibraryPodcasts,
        Self::LibraryArtistsEdit,
        Self::LibraryAlbumsEdit,
        Self::LibraryTracksEdit,
        Self::LibraryPlaylistsEdit,
        Self::LibraryRadiosEdit,
        Self::LibraryAudiobooksEdit,
        Self::LibraryPodcastsEdit,
        Self::PlaylistTracksEdit,
        Self::PlaylistCreate,
        Self::Search,
        Self::SimilarTracks,
        Self::Recommendations,
    ];

    const fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

/// Set of provider features with O(1) membership
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProviderFeatures(u32);

impl ProviderFeatures {
    /// Empty feature set
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add a feature to the set
    pub fn insert(&mut self, feature: ProviderFeature) {
        self.0 |= feature.bit();
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, feature: ProviderFeature) -> Self {
        self.insert(feature);
        self
    }

    /// Remove a feature from the set
    pub fn remove(&mut self, feature: ProviderFeature) {
        self.0 &= !feature.bit();
    }

    #[must_use]
    pub const fn contains(&self, feature: ProviderFeature) -> bool {
        self.0 & feature.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the declared features in bit order
    pub fn iter(&self) -> impl Iterator<Item = ProviderFeature> + '_ {
        ProviderFeature::ALL
            .iter()
            .copied()
            .filter(move |feature| self.contains(*feature))
    }
}

impl FromIterator<ProviderFeature> for ProviderFeatures {
    fn from_iter<I: IntoIterator<Item = ProviderFeature>>(iter: I) -> Self {
        let mut features = Self::empty();
        for feature in iter {
            features.insert(feature);
        }
        features
    }
}

impl fmt::Debug for ProviderFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Serialized as a list of feature names so config files stay readable
impl Serialize for ProviderFeatures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ProviderFeatures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let features = Vec::<ProviderFeature>::deserialize(deserializer)?;
        Ok(features.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let features: ProviderFeatures = [
            ProviderFeature::LibraryTracks,
            ProviderFeature::Recommendations,
        ]
        .into_iter()
        .collect();

        assert!(features.contains(ProviderFeature::LibraryTracks));
        assert!(features.contains(ProviderFeature::Recommendations));
        assert!(!features.contains(ProviderFeature::LibraryTracksEdit));
        assert_eq!(features.iter().count(), 2);
    }

    #[test]
    fn test_remove_leaves_other_bits() {
        let mut features = ProviderFeatures::empty()
            .with(ProviderFeature::LibraryAlbums)
            .with(ProviderFeature::LibraryAlbumsEdit);
        features.remove(ProviderFeature::LibraryAlbums);

        assert!(!features.contains(ProviderFeature::LibraryAlbums));
        assert!(features.contains(ProviderFeature::LibraryAlbumsEdit));
    }

    #[test]
    fn test_serde_as_name_list() {
        let features = ProviderFeatures::empty()
            .with(ProviderFeature::LibraryPodcasts)
            .with(ProviderFeature::PlaylistCreate);
        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, r#"["library_podcasts","playlist_create"]"#);

        let parsed: ProviderFeatures = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, features);
    }
}
