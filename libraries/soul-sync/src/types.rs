use serde::{Deserialize, Serialize};
use soul_core::MediaType;

/// Phase of the pass for one (provider instance, media type) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    CapabilityCheck,
    Running,
    Diffing,
    SnapshotPersisted,
    Unsupported,
}

impl SyncPhase {
    /// A pass in one of these phases holds the pair
    pub fn is_active(self) -> bool {
        matches!(self, Self::CapabilityCheck | Self::Running | Self::Diffing)
    }
}

/// Phase of a known pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStatus {
    pub provider_instance: String,
    pub media_type: MediaType,
    pub phase: SyncPhase,
}

/// Per-item outcomes of the reconcile phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub added: usize,
    pub updated: usize,
    pub favorited: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub children_added: usize,
    pub children_updated: usize,
    pub children_failed: usize,
}

/// Outcomes of the orphan phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanStats {
    pub removed: usize,
    pub demoted: usize,
    pub unfavorited: usize,
    /// Already gone from the library
    pub missing: usize,
    pub failed: usize,
}

/// Summary of a completed sync pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSummary {
    pub pass_id: String,
    pub provider_instance: String,
    pub media_type: MediaType,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: u64,
    /// Size of the persisted snapshot
    pub seen: usize,
    /// Whether a previous snapshot existed to diff against
    pub diffed: bool,
    pub items: ReconcileStats,
    pub orphans: OrphanStats,
}

impl SyncSummary {
    /// Store mutations performed by this pass
    pub fn mutations(&self) -> usize {
        self.items.added
            + self.items.updated
            + self.items.favorited
            + self.items.children_added
            + self.items.children_updated
            + self.orphans.removed
            + self.orphans.demoted
    }
}
