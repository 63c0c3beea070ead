//! Soul Sync command-line front end
//!
//! Wires the sync engine to a file-backed provider, a JSON-persisted library
//! and the SQLite snapshot cache.

pub mod config;
pub mod error;
pub mod provider;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use provider::{CatalogEntry, CatalogFile, FileCatalogProvider};
