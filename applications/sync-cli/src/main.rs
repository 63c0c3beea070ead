/// Soul Sync - reconcile provider catalogs into the canonical library
use anyhow::Context;
use clap::{Parser, Subcommand};
use soul_core::{MediaType, MusicProvider};
use soul_storage::{MemoryLibrary, SqliteSnapshotCache};
use soul_sync::SyncManager;
use soul_sync_cli::{CliConfig, CliError, FileCatalogProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soul-sync")]
#[command(about = "Synchronize provider catalogs into the Soul library", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SOUL_SYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run library sync passes for a catalog file
    Sync {
        /// Provider catalog (JSON)
        catalog: PathBuf,
        /// Only sync this media type (e.g. track, album, playlist)
        #[arg(short, long)]
        media_type: Option<String>,
        /// Mark every synced item as favourite
        #[arg(long)]
        favorite: bool,
    },
    /// Print library entities as JSON lines
    Library {
        /// Only list this media type
        #[arg(short, long)]
        media_type: Option<String>,
    },
    /// Delete expired sync snapshots
    Cleanup,
    /// Delete sync snapshots, forcing the next pass to skip orphan detection
    ClearSnapshots {
        /// Only clear snapshots of this media type
        #[arg(short, long)]
        media_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soul_sync=info,soul_storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Sync {
            catalog,
            media_type,
            favorite,
        } => {
            let media_type = media_type.as_deref().map(parse_media_type).transpose()?;
            sync(&config, &catalog, media_type, favorite).await?;
        }
        Commands::Library { media_type } => {
            let media_type = media_type.as_deref().map(parse_media_type).transpose()?;
            list_library(&config, media_type).await?;
        }
        Commands::Cleanup => {
            let cache = SqliteSnapshotCache::connect(&config.cache).await?;
            let removed = cache.cleanup_expired().await?;
            tracing::info!("Removed {} expired snapshots", removed);
        }
        Commands::ClearSnapshots { media_type } => {
            let media_type = media_type.as_deref().map(parse_media_type).transpose()?;
            let cache = SqliteSnapshotCache::connect(&config.cache).await?;
            cache.clear(media_type.map(|m| m.as_str())).await?;
        }
    }

    Ok(())
}

async fn sync(
    config: &CliConfig,
    catalog: &Path,
    media_type: Option<MediaType>,
    import_as_favorite: bool,
) -> anyhow::Result<()> {
    let provider = FileCatalogProvider::open(catalog)
        .await
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;
    let library = Arc::new(MemoryLibrary::open(&config.library_path).await?);
    let snapshots = Arc::new(SqliteSnapshotCache::connect(&config.cache).await?);
    tracing::info!(
        "Syncing {} into {}",
        provider.instance_id(),
        config.library_path.display()
    );

    let shutdown = CancellationToken::new();
    let manager = SyncManager::new(library.clone(), snapshots, config.sync.clone())
        .with_cancellation(shutdown.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling sync");
            shutdown.cancel();
        }
    });

    let results = match media_type {
        Some(media_type) => vec![(
            media_type,
            manager
                .sync_library(&provider, media_type, import_as_favorite)
                .await,
        )],
        None => manager.sync_provider(&provider, import_as_favorite).await,
    };

    // Entities committed by a failed or cancelled pass are kept
    library.save(&config.library_path).await?;

    let mut failed = 0;
    for (media_type, result) in results {
        match result {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(e) => {
                failed += 1;
                tracing::error!(%media_type, error = %e, "Library sync failed");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} sync pass(es) failed");
    }
    Ok(())
}

async fn list_library(config: &CliConfig, media_type: Option<MediaType>) -> anyhow::Result<()> {
    let library = MemoryLibrary::open(&config.library_path).await?;
    let media_types = match media_type {
        Some(media_type) => vec![media_type],
        None => MediaType::LIBRARY
            .into_iter()
            .chain([MediaType::PodcastEpisode])
            .collect(),
    };

    for media_type in media_types {
        for item in library.items(media_type).await {
            println!("{}", serde_json::to_string(&item)?);
        }
    }
    Ok(())
}

fn parse_media_type(name: &str) -> Result<MediaType, CliError> {
    MediaType::from_str(name).ok_or_else(|| CliError::UnknownMediaType(name.to_string()))
}
