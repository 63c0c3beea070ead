//! Provider mappings
//!
//! A mapping ties a canonical library entity to one source-side
//! representation of it. Within one entity the pair
//! (provider instance, item id) is unique.

use serde::{Deserialize, Serialize};

use super::audio::AudioFormat;

/// One source-side representation of a canonical entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMapping {
    /// Source-side item id (opaque)
    pub item_id: String,

    /// Provider type, e.g. "spotify" or "filesystem"
    pub provider_domain: String,

    /// Specific configured connection of that provider type
    pub provider_instance: String,

    /// True while the source claims this entity as part of the user's library
    #[serde(default)]
    pub in_library: bool,

    #[serde(default = "default_available")]
    pub available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_available() -> bool {
    true
}

impl ProviderMapping {
    /// Create an available, not-yet-in-library mapping
    pub fn new(
        item_id: impl Into<String>,
        provider_domain: impl Into<String>,
        provider_instance: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            provider_domain: provider_domain.into(),
            provider_instance: provider_instance.into(),
            in_library: false,
            available: true,
            audio_format: None,
            url: None,
        }
    }

    /// Builder-style `in_library`
    #[must_use]
    pub fn in_library(mut self, in_library: bool) -> Self {
        self.in_library = in_library;
        self
    }

    /// Builder-style `available`
    #[must_use]
    pub fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Whether this mapping is the given instance's representation of `item_id`
    #[must_use]
    pub fn is(&self, provider_instance: &str, item_id: &str) -> bool {
        self.provider_instance == provider_instance && self.item_id == item_id
    }
}

/// Insert `mapping` into `mappings`, replacing any mapping with the same
/// (provider instance, item id). Keeps the uniqueness invariant.
pub fn upsert_mapping(mappings: &mut Vec<ProviderMapping>, mapping: ProviderMapping) {
    match mappings
        .iter_mut()
        .find(|existing| existing.is(&mapping.provider_instance, &mapping.item_id))
    {
        Some(existing) => *existing = mapping,
        None => mappings.push(mapping),
    }
}
