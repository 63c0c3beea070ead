/// Snapshot cache configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Lifetime of a stored snapshot
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,

    /// Snapshots kept in the in-memory front
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            expiration_secs: default_expiration_secs(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://soul-sync-cache.db".to_string()
}

fn default_expiration_secs() -> u64 {
    // 30 days
    30 * 24 * 3600
}

fn default_memory_capacity() -> usize {
    500
}
