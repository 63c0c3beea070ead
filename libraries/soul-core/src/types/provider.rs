//! Provider descriptor and capability contract

use serde::{Deserialize, Serialize};

use super::features::{ProviderFeature, ProviderFeatures};
use super::media_type::MediaType;

/// Identity and declared capabilities of one configured provider instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider type, e.g. "spotify"
    pub domain: String,

    /// Specific configured connection, e.g. "spotify--x1"
    pub instance_id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub features: ProviderFeatures,

    /// Catalog is identical across every instance of this domain
    #[serde(default)]
    pub is_streaming: bool,

    /// Domain can be configured more than once
    #[serde(default)]
    pub multi_instance: bool,
}

impl ProviderDescriptor {
    /// Create a private, single-instance descriptor with no features
    pub fn new(domain: impl Into<String>, instance_id: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            name: domain.clone(),
            domain,
            instance_id: instance_id.into(),
            features: ProviderFeatures::empty(),
            is_streaming: false,
            multi_instance: false,
        }
    }

    #[must_use]
    pub fn with_feature(mut self, feature: ProviderFeature) -> Self {
        self.features.insert(feature);
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: impl IntoIterator<Item = ProviderFeature>) -> Self {
        for feature in features {
            self.features.insert(feature);
        }
        self
    }

    #[must_use]
    pub fn streaming(mut self, is_streaming: bool) -> Self {
        self.is_streaming = is_streaming;
        self
    }

    #[must_use]
    pub fn multi_instance(mut self, multi_instance: bool) -> Self {
        self.multi_instance = multi_instance;
        self
    }

    /// Key under which this provider's catalog results may be shared
    ///
    /// Streaming providers and single-instance domains share one catalog per
    /// domain. Anything else (a personal server, a local share) is private to
    /// its instance.
    #[must_use]
    pub fn lookup_key(&self) -> &str {
        if self.is_streaming || !self.multi_instance {
            &self.domain
        } else {
            &self.instance_id
        }
    }

    /// Whether a library of `media_type` can be synced from this provider
    #[must_use]
    pub fn library_supported(&self, media_type: MediaType) -> bool {
        media_type
            .library_feature()
            .is_some_and(|feature| self.features.contains(feature))
    }

    /// Whether library add/remove of `media_type` is accepted by this provider
    #[must_use]
    pub fn library_edit_supported(&self, media_type: MediaType) -> bool {
        media_type
            .library_edit_feature()
            .is_some_and(|feature| self.features.contains(feature))
    }

    /// Library media types this provider can sync, in canonical order
    pub fn supported_library_types(&self) -> impl Iterator<Item = MediaType> + '_ {
        MediaType::LIBRARY
            .iter()
            .copied()
            .filter(move |media_type| self.library_supported(*media_type))
    }
}
