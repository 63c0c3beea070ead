/// Core error types for library synchronization
use thiserror::Error;

use crate::types::ItemId;

/// Result type alias using `SoulError`
pub type Result<T> = std::result::Result<T, SoulError>;

/// Core error type shared by providers, stores and the sync engine
#[derive(Error, Debug)]
pub enum SoulError {
    /// Referenced source or library item vanished between lookup and use
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Provider/API failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Library store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// A source item's mapping does not match its own provider identity
    #[error("Inconsistent provider mapping: {0}")]
    ConsistencyViolation(String),

    /// Removal blocked because other entities still reference the item
    #[error("Item {id} still has dependents: {reason}")]
    HasDependents { id: ItemId, reason: String },

    /// Feature not declared by this provider
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl SoulError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a not found error for a library item
    pub fn item_not_found(id: ItemId) -> Self {
        Self::not_found("Library item", id.to_string())
    }

    /// Create a consistency violation
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::ConsistencyViolation(msg.into())
    }

    /// Create a dependents error
    pub fn has_dependents(id: ItemId, reason: impl Into<String>) -> Self {
        Self::HasDependents {
            id,
            reason: reason.into(),
        }
    }

    /// Create an unsupported feature error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFeature(msg.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_dependents(&self) -> bool {
        matches!(self, Self::HasDependents { .. })
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFeature(_))
    }
}
