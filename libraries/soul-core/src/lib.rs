//! Soul Sync Core
//!
//! Domain types, traits, and error handling shared by the library sync
//! engine, its storage backends, and provider implementations.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `MediaItem`, `LibraryItem`, `ProviderMapping`, `ProviderDescriptor`
//! - **Catalog Iteration**: `CatalogStream` and the `paginate` adapter
//! - **Core Traits**: `MusicProvider`, `LibraryStore`, `SnapshotCache`
//! - **Error Handling**: Unified `SoulError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use soul_core::types::{MediaItem, MediaType, ProviderDescriptor, ProviderFeature};
//!
//! let provider = ProviderDescriptor::new("plex", "plex--home")
//!     .multi_instance(true)
//!     .with_feature(ProviderFeature::LibraryTracks);
//! assert!(provider.library_supported(MediaType::Track));
//! assert_eq!(provider.lookup_key(), "plex--home");
//!
//! let track = MediaItem::new(MediaType::Track, "42", "plex", "plex--home", "Song");
//! assert_eq!(track.uri(), "plex--home://track/42");
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use catalog::{paginate, CatalogStream};
pub use error::{Result, SoulError};
pub use storage::{LibraryStore, SnapshotCache};
pub use traits::MusicProvider;

pub use types::{
    upsert_mapping, AudioFormat, ContentType, ItemId, LibraryItem, MediaItem, MediaType,
    ProviderDescriptor, ProviderFeature, ProviderFeatures, ProviderMapping, ResumeState,
    SampleRate,
};
