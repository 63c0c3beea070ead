use soul_core::{MediaType, SoulError};
use thiserror::Error;

/// Errors that end a sync pass
///
/// Per-item failures never show up here: they are logged and counted in the
/// pass summary.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Library sync of {media_type} not supported by {provider}")]
    Unsupported {
        provider: String,
        media_type: MediaType,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[source] SoulError),

    #[error("Snapshot cache error: {0}")]
    Snapshot(#[source] SoulError),

    #[error("Sync already in progress")]
    AlreadySyncing,

    #[error("Sync was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
