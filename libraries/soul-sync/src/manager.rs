use crate::{
    error::Result, handlers::HandlerTable, orphans, reconciler, reconciler::SyncContext,
    PassStatus, ReconcileStats, SyncError, SyncPhase, SyncSettings, SyncSummary,
};
use futures::stream::{self, StreamExt};
use soul_core::{LibraryStore, MediaType, MusicProvider, SnapshotCache};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type PassKey = (String, MediaType);

struct PassState {
    phase: SyncPhase,
    cancel: CancellationToken,
}

/// Orchestrates library sync passes
///
/// One pass covers one (provider instance, media type) pair:
/// capability check, reconcile, orphan collection, snapshot persistence.
/// Passes for different pairs may run concurrently; a second pass for a pair
/// that is already running is rejected.
pub struct SyncManager {
    store: Arc<dyn LibraryStore>,
    snapshots: Arc<dyn SnapshotCache>,
    settings: SyncSettings,
    handlers: HandlerTable,
    shutdown: CancellationToken,
    passes: Mutex<HashMap<PassKey, PassState>>,
}

impl SyncManager {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        snapshots: Arc<dyn SnapshotCache>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            snapshots,
            settings,
            handlers: HandlerTable::standard(),
            shutdown: CancellationToken::new(),
            passes: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the handler table
    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Parent token; cancelling it cancels every current and future pass
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one library sync pass
    ///
    /// Per-item failures are logged and counted in the summary. The pass only
    /// fails when the media type is unsupported, the catalog itself fails,
    /// the snapshot cache fails, or the pass is cancelled. In every failure
    /// case the previous snapshot is left untouched.
    pub async fn sync_library(
        &self,
        provider: &dyn MusicProvider,
        media_type: MediaType,
        import_as_favorite: bool,
    ) -> Result<SyncSummary> {
        let instance = provider.instance_id().to_string();
        let cancel = self.begin_pass(&instance, media_type)?;
        let _guard = PassGuard {
            manager: self,
            key: (instance.clone(), media_type),
        };

        if !provider.descriptor().library_supported(media_type) {
            self.set_phase(&instance, media_type, SyncPhase::Unsupported);
            warn!(provider = %instance, %media_type, "Library sync not supported");
            return Err(SyncError::Unsupported {
                provider: instance,
                media_type,
            });
        }

        let pass_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let category = media_type.as_str();
        debug!(%pass_id, provider = %instance, %media_type, "Starting library sync");

        let previous = self
            .snapshots
            .get(category, &instance)
            .await
            .map_err(SyncError::Snapshot)?;

        self.set_phase(&instance, media_type, SyncPhase::Running);
        let ctx = SyncContext {
            provider,
            store: self.store.as_ref(),
            settings: &self.settings,
            handlers: &self.handlers,
            cancel: &cancel,
        };
        let mut items = ReconcileStats::default();
        let seen = match reconciler::reconcile(&ctx, media_type, import_as_favorite, &mut items)
            .await
        {
            Ok(seen) => seen,
            Err(e) => {
                error!(%pass_id, provider = %instance, %media_type, error = %e, "Library sync aborted");
                return Err(e);
            }
        };

        self.set_phase(&instance, media_type, SyncPhase::Diffing);
        let orphans = match &previous {
            Some(previous) => {
                orphans::collect_orphans(
                    self.store.as_ref(),
                    &instance,
                    media_type,
                    previous,
                    &seen,
                    &cancel,
                )
                .await?
            }
            None => {
                debug!(provider = %instance, %media_type, "No previous snapshot, skipping orphan detection");
                Default::default()
            }
        };

        self.snapshots
            .set(category, &instance, &seen)
            .await
            .map_err(SyncError::Snapshot)?;
        self.set_phase(&instance, media_type, SyncPhase::SnapshotPersisted);

        let summary = SyncSummary {
            pass_id,
            provider_instance: instance,
            media_type,
            started_at,
            completed_at: chrono::Utc::now().to_rfc3339(),
            duration_ms: started.elapsed().as_millis() as u64,
            seen: seen.len(),
            diffed: previous.is_some(),
            items,
            orphans,
        };

        info!(
            "Library sync of {} for {} complete: {} added, {} updated, {} favorited, {} failed, {} removed, {} demoted in {}ms",
            summary.media_type,
            summary.provider_instance,
            summary.items.added,
            summary.items.updated,
            summary.items.favorited,
            summary.items.failed,
            summary.orphans.removed,
            summary.orphans.demoted,
            summary.duration_ms
        );

        Ok(summary)
    }

    /// Sync every library media type the provider supports
    ///
    /// Unsupported types are skipped. Results come back in media type order.
    pub async fn sync_provider(
        &self,
        provider: &dyn MusicProvider,
        import_as_favorite: bool,
    ) -> Vec<(MediaType, Result<SyncSummary>)> {
        let descriptor = provider.descriptor();
        for media_type in MediaType::LIBRARY {
            if !descriptor.library_supported(media_type) {
                debug!(provider = %descriptor.instance_id, %media_type, "Skipping unsupported media type");
            }
        }

        let media_types: Vec<MediaType> = descriptor.supported_library_types().collect();
        let mut results: Vec<_> = stream::iter(media_types)
            .map(|media_type| async move {
                let result = self
                    .sync_library(provider, media_type, import_as_favorite)
                    .await;
                (media_type, result)
            })
            .buffer_unordered(self.settings.max_concurrent_passes.max(1))
            .collect()
            .await;
        results.sort_by_key(|(media_type, _)| *media_type);
        results
    }

    /// Current phase of the pass for a pair
    pub fn phase(&self, provider_instance: &str, media_type: MediaType) -> SyncPhase {
        self.lock_passes()
            .get(&(provider_instance.to_string(), media_type))
            .map_or(SyncPhase::Idle, |pass| pass.phase)
    }

    /// Passes currently holding a pair
    pub fn active_passes(&self) -> Vec<PassStatus> {
        let mut active: Vec<PassStatus> = self
            .lock_passes()
            .iter()
            .filter(|(_, pass)| pass.phase.is_active())
            .map(|((instance, media_type), pass)| PassStatus {
                provider_instance: instance.clone(),
                media_type: *media_type,
                phase: pass.phase,
            })
            .collect();
        active.sort_by(|a, b| {
            (&a.provider_instance, a.media_type).cmp(&(&b.provider_instance, b.media_type))
        });
        active
    }

    /// Cancel the running pass for a pair
    ///
    /// Returns `false` if no such pass is running.
    pub fn cancel(&self, provider_instance: &str, media_type: MediaType) -> bool {
        match self
            .lock_passes()
            .get(&(provider_instance.to_string(), media_type))
        {
            Some(pass) if pass.phase.is_active() => {
                info!(provider = provider_instance, %media_type, "Cancelling library sync");
                pass.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel every running pass
    pub fn cancel_all(&self) {
        for pass in self.lock_passes().values() {
            pass.cancel.cancel();
        }
    }

    fn begin_pass(&self, provider_instance: &str, media_type: MediaType) -> Result<CancellationToken> {
        let mut passes = self.lock_passes();
        let key = (provider_instance.to_string(), media_type);
        if passes.get(&key).is_some_and(|pass| pass.phase.is_active()) {
            return Err(SyncError::AlreadySyncing);
        }
        let cancel = self.shutdown.child_token();
        passes.insert(
            key,
            PassState {
                phase: SyncPhase::CapabilityCheck,
                cancel: cancel.clone(),
            },
        );
        Ok(cancel)
    }

    fn set_phase(&self, provider_instance: &str, media_type: MediaType, phase: SyncPhase) {
        if let Some(pass) = self
            .lock_passes()
            .get_mut(&(provider_instance.to_string(), media_type))
        {
            pass.phase = phase;
        }
    }

    fn lock_passes(&self) -> MutexGuard<'_, HashMap<PassKey, PassState>> {
        self.passes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the pair when a pass ends, however it ends
struct PassGuard<'a> {
    manager: &'a SyncManager,
    key: PassKey,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let mut passes = self.manager.lock_passes();
        match passes.get_mut(&self.key) {
            Some(pass) if pass.phase == SyncPhase::Unsupported => {}
            Some(pass) => pass.phase = SyncPhase::Idle,
            None => {}
        }
    }
}
