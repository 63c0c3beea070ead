mod audio;
mod features;
mod ids;
mod item;
mod mapping;
mod media_type;
mod provider;

pub use audio::{AudioFormat, ContentType, SampleRate};
pub use features::{ProviderFeature, ProviderFeatures};
pub use ids::ItemId;
pub use item::{LibraryItem, MediaItem, ResumeState};
pub use mapping::{upsert_mapping, ProviderMapping};
pub use media_type::MediaType;
pub use provider::ProviderDescriptor;
