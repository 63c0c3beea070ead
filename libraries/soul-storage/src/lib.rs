//! Soul Sync Storage
//!
//! Reference implementations of the stores the sync engine works against.
//!
//! # Architecture
//!
//! - **Library**: [`MemoryLibrary`], an in-memory canonical library with
//!   JSON persistence and playlist/parent dependency tracking
//! - **Snapshots**: [`MemorySnapshotCache`] for tests and one-shot runs,
//!   [`SqliteSnapshotCache`] for durable snapshots behind an LRU front
//!
//! # Example
//!
//! ```rust,no_run
//! use soul_storage::{CacheSettings, SqliteSnapshotCache};
//! use soul_core::SnapshotCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = CacheSettings {
//!     database_url: "sqlite://cache.db".to_string(),
//!     ..CacheSettings::default()
//! };
//! let cache = SqliteSnapshotCache::connect(&settings).await?;
//!
//! let previous = cache.get("track", "plex--home").await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;

pub mod library;
pub mod snapshots;

pub use config::CacheSettings;
pub use error::StorageError;
pub use library::MemoryLibrary;
pub use snapshots::{MemorySnapshotCache, SqliteSnapshotCache};

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://cache.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!("Creating snapshot cache pool with URL: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
