//! Orphan collection
//!
//! Entities seen by the previous pass but not by this one have disappeared
//! from the provider. Each one is removed when no other provider instance
//! claims it, and demoted (this instance's mapping flipped to
//! `in_library = false`) otherwise.

use soul_core::{ItemId, LibraryStore, MediaType};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::types::OrphanStats;

enum Resolution {
    Missing,
    Removed,
    Demoted { unfavorited: bool },
}

/// Resolve every id in `previous` that is absent from `seen`
pub(crate) async fn collect_orphans(
    store: &dyn LibraryStore,
    provider_instance: &str,
    media_type: MediaType,
    previous: &HashSet<ItemId>,
    seen: &HashSet<ItemId>,
    cancel: &CancellationToken,
) -> Result<OrphanStats> {
    let mut orphans: Vec<ItemId> = previous.difference(seen).copied().collect();
    orphans.sort_unstable();
    debug!(
        provider = provider_instance,
        %media_type,
        count = orphans.len(),
        "Resolving orphaned library items"
    );

    let mut stats = OrphanStats::default();
    for id in orphans {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        match resolve(store, provider_instance, media_type, id).await {
            Ok(Resolution::Missing) => stats.missing += 1,
            Ok(Resolution::Removed) => stats.removed += 1,
            Ok(Resolution::Demoted { unfavorited }) => {
                stats.demoted += 1;
                if unfavorited {
                    stats.unfavorited += 1;
                }
            }
            Err(e) => {
                stats.failed += 1;
                warn!(provider = provider_instance, %media_type, %id, error = %e, "Failed to resolve orphan");
            }
        }

        tokio::task::yield_now().await;
    }

    if stats.removed + stats.demoted > 0 {
        info!(
            provider = provider_instance,
            %media_type,
            removed = stats.removed,
            demoted = stats.demoted,
            "Processed library items no longer reported by provider"
        );
    }

    Ok(stats)
}

async fn resolve(
    store: &dyn LibraryStore,
    provider_instance: &str,
    media_type: MediaType,
    id: ItemId,
) -> soul_core::Result<Resolution> {
    let item = match store.get(id).await {
        Ok(item) => item,
        Err(e) if e.is_not_found() => return Ok(Resolution::Missing),
        Err(e) => return Err(e),
    };

    if item.other_library_instances(provider_instance).next().is_some() {
        store
            .set_mapping_in_library(id, provider_instance, false)
            .await?;
        return Ok(Resolution::Demoted { unfavorited: false });
    }

    match store.remove(id, media_type == MediaType::Album).await {
        Ok(()) => Ok(Resolution::Removed),
        Err(e) if e.is_not_found() => Ok(Resolution::Missing),
        Err(e) => {
            debug!(%id, error = %e, "Removal refused, demoting instead");
            if item.favorite {
                store.set_favorite(id, false).await?;
            }
            store
                .set_mapping_in_library(id, provider_instance, false)
                .await?;
            Ok(Resolution::Demoted {
                unfavorited: item.favorite,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use soul_core::{LibraryItem, MediaItem, ProviderMapping, SoulError};

    mock! {
        Store {}

        #[async_trait]
        impl LibraryStore for Store {
            async fn lookup_by_mapping(
                &self,
                media_type: MediaType,
                mappings: &[ProviderMapping],
                lookup_key: &str,
            ) -> soul_core::Result<Option<LibraryItem>>;
            async fn add(&self, item: MediaItem) -> soul_core::Result<LibraryItem>;
            async fn update(&self, id: ItemId, item: MediaItem) -> soul_core::Result<LibraryItem>;
            async fn remove(&self, id: ItemId, recursive: bool) -> soul_core::Result<()>;
            async fn set_favorite(&self, id: ItemId, favorite: bool) -> soul_core::Result<()>;
            async fn set_provider_mappings(
                &self,
                id: ItemId,
                mappings: Vec<ProviderMapping>,
            ) -> soul_core::Result<()>;
            async fn get(&self, id: ItemId) -> soul_core::Result<LibraryItem>;
            async fn set_mapping_in_library(
                &self,
                id: ItemId,
                provider_instance: &str,
                in_library: bool,
            ) -> soul_core::Result<()>;
        }
    }

    const HOME: &str = "plex--home";

    fn entity(favorite: bool, instances: &[&str]) -> LibraryItem {
        LibraryItem {
            id: ItemId::new(7),
            media_type: MediaType::Track,
            name: "Song".to_string(),
            favorite,
            provider_mappings: instances
                .iter()
                .map(|instance| ProviderMapping::new("t7", "plex", *instance).in_library(true))
                .collect(),
            cache_checksum: None,
            resume: None,
            parent: None,
            added_at: 0,
            updated_at: 0,
        }
    }

    fn one_orphan() -> (HashSet<ItemId>, HashSet<ItemId>) {
        ([ItemId::new(7)].into_iter().collect(), HashSet::new())
    }

    #[tokio::test]
    async fn test_claimed_orphan_is_demoted_without_removal() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Ok(entity(true, &[HOME, "plex--office"])));
        store
            .expect_set_mapping_in_library()
            .times(1)
            .returning(|_, _, _| Ok(()));
        store.expect_remove().never();
        store.expect_set_favorite().never();

        let (previous, seen) = one_orphan();
        let stats = collect_orphans(
            &store,
            HOME,
            MediaType::Track,
            &previous,
            &seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.demoted, 1);
        assert_eq!(stats.unfavorited, 0);
    }

    #[tokio::test]
    async fn test_refused_removal_falls_back_to_demotion() {
        let mut store = MockStore::new();
        store.expect_get().returning(|_| Ok(entity(true, &[HOME])));
        store
            .expect_remove()
            .times(1)
            .returning(|_, _| Err(SoulError::storage("database is locked")));
        store
            .expect_set_favorite()
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_mapping_in_library()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (previous, seen) = one_orphan();
        let stats = collect_orphans(
            &store,
            HOME,
            MediaType::Track,
            &previous,
            &seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.demoted, 1);
        assert_eq!(stats.unfavorited, 1);
        assert_eq!(stats.removed, 0);
    }

    #[tokio::test]
    async fn test_vanished_orphans_are_missing() {
        let mut store = MockStore::new();
        let mut calls = 0;
        store.expect_get().returning(move |id| {
            calls += 1;
            if calls == 1 {
                Err(SoulError::item_not_found(id))
            } else {
                Ok(entity(false, &[HOME]))
            }
        });
        // Removed concurrently between get and remove
        store
            .expect_remove()
            .times(1)
            .returning(|id, _| Err(SoulError::item_not_found(id)));

        let previous = [ItemId::new(1), ItemId::new(2)].into_iter().collect();
        let stats = collect_orphans(
            &store,
            HOME,
            MediaType::Track,
            &previous,
            &HashSet::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.missing, 2);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_counted() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Err(SoulError::storage("disk I/O error")));

        let (previous, seen) = one_orphan();
        let stats = collect_orphans(
            &store,
            HOME,
            MediaType::Track,
            &previous,
            &seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.removed + stats.demoted, 0);
    }

    #[tokio::test]
    async fn test_album_orphans_are_removed_recursively() {
        let mut store = MockStore::new();
        store.expect_get().returning(|_| Ok(entity(false, &[HOME])));
        store
            .expect_remove()
            .withf(|_, recursive| *recursive)
            .times(1)
            .returning(|_, _| Ok(()));

        let (previous, seen) = one_orphan();
        let stats = collect_orphans(
            &store,
            HOME,
            MediaType::Album,
            &previous,
            &seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.removed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_orphan() {
        let store = MockStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (previous, seen) = one_orphan();
        let result =
            collect_orphans(&store, HOME, MediaType::Track, &previous, &seen, &cancel).await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
    }
}
