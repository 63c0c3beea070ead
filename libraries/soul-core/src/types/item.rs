//! Media items
//!
//! [`MediaItem`] is the provider-shaped record yielded by a catalog;
//! [`LibraryItem`] is the canonical, deduplicated entity owned by the
//! library store.

use serde::{Deserialize, Serialize};

use super::ids::ItemId;
use super::mapping::ProviderMapping;
use super::media_type::MediaType;

/// Playback progress for audiobooks and podcast episodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub position_ms: u64,
    pub fully_played: bool,
}

/// Item as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Source-side id this item was fetched by
    pub item_id: String,

    /// Instance id of the issuing provider
    pub provider: String,

    pub media_type: MediaType,
    pub name: String,

    #[serde(default)]
    pub favorite: bool,

    /// Must contain the issuing provider's own mapping
    pub provider_mappings: Vec<ProviderMapping>,

    /// Provider "version" token; playlists use it to detect content changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_position_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_played: Option<bool>,

    /// Provider id of the containing album (tracks) or podcast (episodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl MediaItem {
    /// Create an item carrying a single self-mapping for `provider_instance`
    pub fn new(
        media_type: MediaType,
        item_id: impl Into<String>,
        provider_domain: impl Into<String>,
        provider_instance: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let item_id = item_id.into();
        let provider_instance = provider_instance.into();
        let mapping = ProviderMapping::new(
            item_id.clone(),
            provider_domain,
            provider_instance.clone(),
        );
        Self {
            item_id,
            provider: provider_instance,
            media_type,
            name: name.into(),
            favorite: false,
            provider_mappings: vec![mapping],
            cache_checksum: None,
            resume_position_ms: None,
            fully_played: None,
            parent_id: None,
        }
    }

    /// Provider URI, e.g. `spotify--x1://track/42`
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", self.provider, self.media_type, self.item_id)
    }

    /// An item is available when any of its mappings is
    #[must_use]
    pub fn available(&self) -> bool {
        self.provider_mappings.iter().any(|m| m.available)
    }

    /// Resume state, only when the provider reports both halves
    #[must_use]
    pub fn resume_state(&self) -> Option<ResumeState> {
        match (self.resume_position_ms, self.fully_played) {
            (Some(position_ms), Some(fully_played)) => Some(ResumeState {
                position_ms,
                fully_played,
            }),
            _ => None,
        }
    }

    /// Builder-style availability for every mapping
    #[must_use]
    pub fn with_available(mut self, available: bool) -> Self {
        for mapping in &mut self.provider_mappings {
            mapping.available = available;
        }
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.cache_checksum = Some(checksum.into());
        self
    }

    #[must_use]
    pub fn with_resume(mut self, position_ms: u64, fully_played: bool) -> Self {
        self.resume_position_ms = Some(position_ms);
        self.fully_played = Some(fully_played);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Canonical library entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: ItemId,
    pub media_type: MediaType,
    pub name: String,
    pub favorite: bool,
    pub provider_mappings: Vec<ProviderMapping>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeState>,

    /// Owning album (tracks) or podcast (episodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,

    /// Unix epoch seconds
    pub added_at: i64,

    /// Unix epoch seconds
    pub updated_at: i64,
}

impl LibraryItem {
    /// An entity is available when any of its mappings is
    #[must_use]
    pub fn available(&self) -> bool {
        self.provider_mappings.iter().any(|m| m.available)
    }

    /// Whether any mapping still claims the entity as in-library
    #[must_use]
    pub fn in_any_library(&self) -> bool {
        self.provider_mappings.iter().any(|m| m.in_library)
    }

    /// Mapping for (provider instance, item id), if present
    #[must_use]
    pub fn mapping(&self, provider_instance: &str, item_id: &str) -> Option<&ProviderMapping> {
        self.provider_mappings
            .iter()
            .find(|m| m.is(provider_instance, item_id))
    }

    /// Provider instances other than `exclude` that still claim this entity
    pub fn other_library_instances<'a>(
        &'a self,
        exclude: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.provider_mappings
            .iter()
            .filter(move |m| m.provider_instance != exclude && m.in_library)
            .map(|m| m.provider_instance.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_state_requires_both_fields() {
        let item = MediaItem::new(MediaType::Audiobook, "b1", "audible", "audible--a", "Book");
        assert!(item.resume_state().is_none());

        let mut half = item.clone();
        half.resume_position_ms = Some(1_000);
        assert!(half.resume_state().is_none());

        let full = item.with_resume(1_000, false);
        assert_eq!(
            full.resume_state(),
            Some(ResumeState {
                position_ms: 1_000,
                fully_played: false
            })
        );
    }

    #[test]
    fn test_uri_format() {
        let item = MediaItem::new(MediaType::Track, "42", "spotify", "spotify--x1", "Song");
        assert_eq!(item.uri(), "spotify--x1://track/42");
    }
}
