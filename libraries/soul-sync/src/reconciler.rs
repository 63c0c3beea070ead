//! Mapping reconciler
//!
//! Walks one provider catalog item by item and merges each item into the
//! canonical library: look up, then create, favourite, update, or leave
//! alone. Returns the ids of every entity observed, which is the only input
//! the orphan collector needs.

use futures::TryStreamExt;
use soul_core::{
    CatalogStream, ItemId, LibraryItem, LibraryStore, MediaItem, MediaType, MusicProvider,
    ProviderMapping,
};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SyncSettings;
use crate::consistency;
use crate::error::{Result, SyncError};
use crate::handlers::{HandlerTable, SyncHandler};
use crate::types::ReconcileStats;

/// Collaborators of one sync pass
pub struct SyncContext<'a> {
    pub provider: &'a dyn MusicProvider,
    pub store: &'a dyn LibraryStore,
    pub settings: &'a SyncSettings,
    pub handlers: &'a HandlerTable,
    pub cancel: &'a CancellationToken,
}

impl SyncContext<'_> {
    fn instance_id(&self) -> &str {
        self.provider.instance_id()
    }

    fn lookup_key(&self) -> &str {
        self.provider.descriptor().lookup_key()
    }

    /// Per-item fairness and cancellation checkpoint
    async fn checkpoint(&self) -> Result<()> {
        tokio::task::yield_now().await;
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}

/// Reconcile the provider's library catalog for `media_type`
///
/// Items are processed strictly in catalog order, one at a time. A failing
/// item is logged and counted; only cancellation or a failing catalog ends
/// the walk early.
pub(crate) async fn reconcile(
    ctx: &SyncContext<'_>,
    media_type: MediaType,
    import_as_favorite: bool,
    stats: &mut ReconcileStats,
) -> Result<HashSet<ItemId>> {
    let handler = ctx.handlers.get(media_type);
    let mut catalog = ctx.provider.library_items(media_type);
    let mut seen = HashSet::new();

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let Some(item) = catalog.try_next().await.map_err(SyncError::Catalog)? else {
            break;
        };

        let uri = item.uri();
        match reconcile_item(ctx, handler, item, import_as_favorite, stats).await {
            Ok(Some(id)) => {
                seen.insert(id);
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                stats.failed += 1;
                warn!(%media_type, %uri, error = %e, "Failed to sync library item");
            }
        }

        ctx.checkpoint().await?;
    }

    Ok(seen)
}

async fn reconcile_item(
    ctx: &SyncContext<'_>,
    handler: &dyn SyncHandler,
    mut item: MediaItem,
    import_as_favorite: bool,
    stats: &mut ReconcileStats,
) -> soul_core::Result<Option<ItemId>> {
    let instance = ctx.instance_id();
    consistency::validate_self_mapping(&item, instance)?;
    consistency::set_own_in_library(&mut item, instance, true);

    let existing = ctx
        .store
        .lookup_by_mapping(item.media_type, &item.provider_mappings, ctx.lookup_key())
        .await?;

    let entity = match existing {
        None => {
            if !handler.admit_new(&item) {
                debug!(uri = %item.uri(), "Skipping unavailable new item");
                return Ok(None);
            }
            if import_as_favorite {
                item.favorite = true;
            }
            let entity = ctx.store.add(item.clone()).await?;
            stats.added += 1;
            entity
        }
        Some(mut existing) => {
            let promoted = import_as_favorite && !existing.favorite;
            if promoted {
                ctx.store.set_favorite(existing.id, true).await?;
                existing.favorite = true;
                stats.favorited += 1;
            }

            // Promotion alone leaves the mapping as it was
            if handler.has_changed(&existing, &item)
                || !consistency::check_mappings(&existing, &mut item, instance, true)?
            {
                let entity = ctx.store.update(existing.id, item.clone()).await?;
                stats.updated += 1;
                entity
            } else {
                if !promoted {
                    stats.unchanged += 1;
                }
                existing
            }
        }
    };

    handler.sync_children(ctx, &entity, &item, stats).await;
    Ok(Some(entity.id))
}

/// Pull the children of `parent` into the library
///
/// Children are created or re-mapped but never favourited and never reported
/// as seen. A failing child is logged and counted; a failing child stream
/// stops the fan-out for this parent only.
pub(crate) async fn sync_children(
    ctx: &SyncContext<'_>,
    parent: &MediaItem,
    mut children: CatalogStream<'_>,
    stats: &mut ReconcileStats,
) {
    loop {
        if ctx.cancel.is_cancelled() {
            return;
        }
        let child = match children.try_next().await {
            Ok(Some(child)) => child,
            Ok(None) => return,
            Err(e) if e.is_unsupported() => {
                debug!(parent = %parent.uri(), error = %e, "Provider lists no children");
                return;
            }
            Err(e) => {
                stats.children_failed += 1;
                warn!(parent = %parent.uri(), error = %e, "Failed to list children");
                return;
            }
        };

        let uri = child.uri();
        match sync_child(ctx, child).await {
            Ok(ChildOutcome::Added) => stats.children_added += 1,
            Ok(ChildOutcome::Updated) => stats.children_updated += 1,
            Ok(ChildOutcome::Unchanged) => {}
            Err(e) => {
                stats.children_failed += 1;
                warn!(parent = %parent.uri(), %uri, error = %e, "Failed to sync child item");
            }
        }
        tokio::task::yield_now().await;
    }
}

enum ChildOutcome {
    Added,
    Updated,
    Unchanged,
}

async fn sync_child(ctx: &SyncContext<'_>, mut child: MediaItem) -> soul_core::Result<ChildOutcome> {
    let instance = ctx.instance_id();
    consistency::validate_self_mapping(&child, instance)?;
    child.favorite = false;

    let handler = ctx.handlers.get(child.media_type);
    let Some(existing) = ctx
        .store
        .lookup_by_mapping(child.media_type, &child.provider_mappings, ctx.lookup_key())
        .await?
    else {
        consistency::set_own_in_library(&mut child, instance, false);
        ctx.store.add(child).await?;
        return Ok(ChildOutcome::Added);
    };

    // A child never changes whether this instance claims it as a library item
    let in_library = library_flag(&existing, instance, &child.item_id);
    consistency::set_own_in_library(&mut child, instance, in_library);

    let relink = match resolve_parent(ctx, &child).await? {
        Some(parent) => existing.parent != Some(parent),
        None => false,
    };
    if relink
        || handler.has_changed(&existing, &child)
        || !consistency::check_mappings(&existing, &mut child, instance, in_library)?
    {
        ctx.store.update(existing.id, child).await?;
        return Ok(ChildOutcome::Updated);
    }
    Ok(ChildOutcome::Unchanged)
}

/// Library id of the child's owner, when the owner is already in the library
async fn resolve_parent(
    ctx: &SyncContext<'_>,
    child: &MediaItem,
) -> soul_core::Result<Option<ItemId>> {
    let (Some(parent_type), Some(parent_id), Some(own)) = (
        child.media_type.parent_type(),
        child.parent_id.as_deref(),
        child.provider_mappings.first(),
    ) else {
        return Ok(None);
    };
    let probe = ProviderMapping::new(parent_id, own.provider_domain.as_str(), ctx.instance_id());
    // Same rule the store applies when linking: the owner under this instance
    let parent = ctx
        .store
        .lookup_by_mapping(parent_type, &[probe], ctx.instance_id())
        .await?;
    Ok(parent.map(|parent| parent.id))
}

fn library_flag(existing: &LibraryItem, instance: &str, item_id: &str) -> bool {
    existing
        .mapping(instance, item_id)
        .is_some_and(|mapping| mapping.in_library)
}
