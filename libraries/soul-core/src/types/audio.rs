/// Audio format metadata attached to provider mappings
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleRate(pub u32);

impl SampleRate {
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Container/codec tag reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Mp3,
    Aac,
    Flac,
    Ogg,
    Opus,
    Wav,
    Alac,
    #[default]
    Unknown,
}

/// Format of the stream a provider serves for one item
///
/// Purely informational for the sync engine: it is carried on the mapping and
/// refreshed whenever the mapping is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AudioFormat {
    pub content_type: ContentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<SampleRate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u16>,

    /// Bit rate in kbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u32>,
}

impl AudioFormat {
    /// Create a format with only a content type
    #[must_use]
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            ..Default::default()
        }
    }

    /// Lossless formats carry no meaningful bit rate
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        matches!(
            self.content_type,
            ContentType::Flac | ContentType::Wav | ContentType::Alac
        )
    }
}
