//! Library synchronization
//!
//! Pulls provider catalogs into the canonical library, keeps provider
//! mappings consistent, and removes or demotes entities that disappeared
//! upstream.

mod config;
pub mod consistency;
mod error;
pub mod handlers;
mod manager;
mod orphans;
mod reconciler;
mod types;

// Public exports
pub use config::SyncSettings;
pub use error::{Result, SyncError};
pub use handlers::{HandlerTable, SyncHandler};
pub use manager::SyncManager;
pub use reconciler::SyncContext;
pub use types::{OrphanStats, PassStatus, ReconcileStats, SyncPhase, SyncSummary};
