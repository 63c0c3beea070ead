/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use soul_storage::CacheSettings;
use soul_sync::SyncSettings;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    /// JSON file holding the canonical library between runs
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            sync: SyncSettings::default(),
            cache: CacheSettings::default(),
            library_path: default_library_path(),
        }
    }
}

impl CliConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Without an explicit path, `soul-sync.toml` in the working directory is
    /// used when present. Environment variables prefixed with `SOUL_SYNC`
    /// override file values, with `__` between nested keys, e.g.
    /// `SOUL_SYNC_SYNC__IMPORT_ALBUM_TRACKS=true`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from("soul-sync.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SOUL_SYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sync.max_concurrent_passes == 0 {
            return Err(CliError::Config(
                "sync.max_concurrent_passes must be at least 1".to_string(),
            ));
        }

        if self.cache.memory_capacity == 0 {
            return Err(CliError::Config(
                "cache.memory_capacity must be at least 1".to_string(),
            ));
        }

        if !self.cache.database_url.starts_with("sqlite:") {
            return Err(CliError::Config(format!(
                "cache.database_url must be a sqlite URL, got {:?}",
                self.cache.database_url
            )));
        }

        Ok(())
    }
}

fn default_library_path() -> PathBuf {
    PathBuf::from("soul-library.json")
}
