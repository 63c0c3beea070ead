use async_trait::async_trait;
use lru::LruCache;
use soul_core::{ItemId, SnapshotCache};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{decode, encode};
use crate::config::CacheSettings;
use crate::error::Result;

struct CachedSnapshot {
    ids: HashSet<ItemId>,
    expires: i64,
}

/// `SQLite`-backed snapshot cache with an LRU memory front
///
/// Snapshots are stored as JSON id lists with an expiration timestamp.
/// Expired snapshots read as absent.
pub struct SqliteSnapshotCache {
    pool: SqlitePool,
    memory: Mutex<LruCache<String, CachedSnapshot>>,
    expiration_secs: i64,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl SqliteSnapshotCache {
    /// Open the database named in `settings` and apply migrations
    pub async fn connect(settings: &CacheSettings) -> Result<Self> {
        let pool = crate::create_pool(&settings.database_url).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::from_pool(pool, settings))
    }

    /// Use an existing, migrated pool
    pub fn from_pool(pool: SqlitePool, settings: &CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            pool,
            memory: Mutex::new(LruCache::new(capacity)),
            expiration_secs: i64::try_from(settings.expiration_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn memory_key(category: &str, base_key: &str) -> String {
        format!("{base_key}/{category}")
    }

    fn lock_memory(&self) -> MutexGuard<'_, LruCache<String, CachedSnapshot>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a snapshot, memory first
    pub async fn fetch(&self, category: &str, base_key: &str) -> Result<Option<HashSet<ItemId>>> {
        let now = now();
        let key = Self::memory_key(category, base_key);

        let cached = self
            .lock_memory()
            .get(&key)
            .filter(|entry| entry.expires > now)
            .map(|entry| entry.ids.clone());
        if cached.is_some() {
            return Ok(cached);
        }

        let row = sqlx::query(
            "SELECT data, expires FROM sync_snapshots WHERE category = ? AND base_key = ?",
        )
        .bind(category)
        .bind(base_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let expires: i64 = row.get("expires");
        if expires <= now {
            debug!(category, base_key, "Snapshot expired");
            return Ok(None);
        }

        let ids = decode(&row.get::<String, _>("data"))?;
        self.lock_memory().put(
            key,
            CachedSnapshot {
                ids: ids.clone(),
                expires,
            },
        );
        Ok(Some(ids))
    }

    /// Write a snapshot, replacing any previous one for the same key
    pub async fn store(&self, category: &str, base_key: &str, ids: &HashSet<ItemId>) -> Result<()> {
        let now = now();
        let expires = now.saturating_add(self.expiration_secs);
        let data = encode(ids)?;

        sqlx::query(
            "INSERT INTO sync_snapshots (category, base_key, data, expires, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(category, base_key) DO UPDATE SET
                data = excluded.data,
                expires = excluded.expires,
                updated_at = excluded.updated_at",
        )
        .bind(category)
        .bind(base_key)
        .bind(&data)
        .bind(expires)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.lock_memory().put(
            Self::memory_key(category, base_key),
            CachedSnapshot {
                ids: ids.clone(),
                expires,
            },
        );
        Ok(())
    }

    /// Delete one snapshot
    ///
    /// Returns `true` if a stored snapshot was deleted.
    pub async fn delete(&self, category: &str, base_key: &str) -> Result<bool> {
        self.lock_memory()
            .pop(&Self::memory_key(category, base_key));

        let result = sqlx::query("DELETE FROM sync_snapshots WHERE category = ? AND base_key = ?")
            .bind(category)
            .bind(base_key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every snapshot, or every snapshot of one category
    pub async fn clear(&self, category: Option<&str>) -> Result<u64> {
        self.lock_memory().clear();

        let result = match category {
            Some(category) => {
                sqlx::query("DELETE FROM sync_snapshots WHERE category = ?")
                    .bind(category)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM sync_snapshots")
                    .execute(&self.pool)
                    .await?
            }
        };

        info!("Cleared {} sync snapshots", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Drop expired snapshots from memory and disk
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let now = now();
        self.lock_memory().clear();

        let result = sqlx::query("DELETE FROM sync_snapshots WHERE expires <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let count = result.rows_affected();
        if count > 0 {
            debug!("Removed {} expired sync snapshots", count);
        }
        Ok(count)
    }
}

#[async_trait]
impl SnapshotCache for SqliteSnapshotCache {
    async fn get(&self, category: &str, base_key: &str) -> soul_core::Result<Option<HashSet<ItemId>>> {
        Ok(self.fetch(category, base_key).await?)
    }

    async fn set(&self, category: &str, base_key: &str, ids: &HashSet<ItemId>) -> soul_core::Result<()> {
        Ok(self.store(category, base_key, ids).await?)
    }
}
