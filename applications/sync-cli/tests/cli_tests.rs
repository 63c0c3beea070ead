//! Integration tests for the sync CLI building blocks
//!
//! Catalog files and config files are written to temp dirs; sync passes run
//! against the persisted library and the SQLite snapshot cache.

use soul_core::{LibraryStore, MediaType, MusicProvider};
use soul_storage::{CacheSettings, MemoryLibrary, SqliteSnapshotCache};
use soul_sync::{SyncManager, SyncSettings};
use soul_sync_cli::{CliConfig, CliError, FileCatalogProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const CATALOG: &str = r#"{
  "provider": {
    "domain": "plex",
    "instance_id": "plex--home",
    "name": "Home server",
    "features": ["library_albums", "library_tracks", "library_playlists"],
    "multi_instance": true
  },
  "library": {
    "album": [{ "id": "al1", "name": "Blue Train" }],
    "track": [
      { "id": "t1", "name": "Blue Train", "parent": "al1" },
      { "id": "t2", "name": "Moment's Notice", "favorite": true },
      { "id": "t3", "name": "Locomotion", "available": false }
    ],
    "playlist": [{ "id": "p1", "name": "Jazz", "checksum": "v1" }]
  },
  "album_tracks": {
    "al1": [{ "id": "t1", "name": "Blue Train" }, { "id": "t4", "name": "I'm Old Fashioned" }]
  },
  "playlist_tracks": {
    "p1": [{ "id": "t2", "name": "Moment's Notice" }, { "id": "t5", "name": "Lazy Bird" }]
  },
  "page_size": 1
}"#;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write test file");
    path
}

fn cache_settings(dir: &Path) -> CacheSettings {
    CacheSettings {
        database_url: format!("sqlite://{}", dir.join("cache.db").display()),
        ..CacheSettings::default()
    }
}

#[tokio::test]
async fn test_catalog_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "catalog.json", CATALOG);

    let provider = FileCatalogProvider::open(&path).await.expect("Failed to load catalog");

    assert_eq!(provider.instance_id(), "plex--home");
    assert!(provider.descriptor().library_supported(MediaType::Track));
    assert!(!provider.descriptor().library_supported(MediaType::Radio));
    assert_eq!(provider.item_count(MediaType::Track), 3);

    let tracks = provider.album_tracks("al1").await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert!(tracks.iter().all(|t| t.parent_id.as_deref() == Some("al1")));
    assert!(tracks.iter().all(|t| t.provider_mappings.len() == 1));

    // page_size 1: two pages, then the empty page
    assert_eq!(provider.playlist_tracks_page("p1", 1).await.unwrap().len(), 1);
    assert!(provider.playlist_tracks_page("p1", 2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_file_rejects_missing_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "catalog.json",
        r#"{ "provider": { "domain": "", "instance_id": "x" } }"#,
    );

    let err = FileCatalogProvider::open(&path).await.unwrap_err();
    assert!(matches!(err, CliError::Catalog(_)));
}

#[tokio::test]
async fn test_sync_persists_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = write_file(&dir, "catalog.json", CATALOG);
    let library_path = dir.path().join("library.json");
    let cache = cache_settings(dir.path());
    let settings = SyncSettings {
        import_album_tracks: true,
        import_playlist_tracks: vec!["Jazz".to_string()],
        ..SyncSettings::default()
    };

    // First run
    {
        let provider = FileCatalogProvider::open(&catalog_path).await.unwrap();
        let library = Arc::new(MemoryLibrary::open(&library_path).await.unwrap());
        let snapshots = Arc::new(SqliteSnapshotCache::connect(&cache).await.unwrap());
        let manager = SyncManager::new(library.clone(), snapshots, settings.clone());

        let results = manager.sync_provider(&provider, false).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        library.save(&library_path).await.unwrap();

        // al1, t1, t2, t4 (album track), p1, t5 (playlist track); t3 is unavailable
        assert_eq!(library.len().await, 6);
    }

    // Second run: t2 disappears upstream
    let trimmed = CATALOG.replace(
        r#"{ "id": "t2", "name": "Moment's Notice", "favorite": true },"#,
        "",
    );
    let catalog_path = write_file(&dir, "catalog.json", &trimmed);
    let provider = FileCatalogProvider::open(&catalog_path).await.unwrap();
    let library = Arc::new(MemoryLibrary::open(&library_path).await.unwrap());
    let snapshots = Arc::new(SqliteSnapshotCache::connect(&cache).await.unwrap());
    let manager = SyncManager::new(library.clone(), snapshots, settings);

    let summary = manager
        .sync_library(&provider, MediaType::Track, false)
        .await
        .unwrap();

    assert!(summary.diffed, "Snapshot must survive between runs");
    assert_eq!(summary.items.unchanged, 1);
    assert_eq!(summary.orphans.removed, 1);
    let probe = soul_core::MediaItem::new(MediaType::Track, "t2", "plex", "plex--home", "");
    assert!(library
        .lookup_by_mapping(MediaType::Track, &probe.provider_mappings, "plex--home")
        .await
        .unwrap()
        .is_none());
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "soul-sync.toml",
        r#"
library_path = "/var/lib/soul/library.json"

[sync]
import_album_tracks = true
import_playlist_tracks = ["Jazz"]

[cache]
expiration_secs = 60
"#,
    );

    let config = CliConfig::load(Some(&path)).expect("Failed to load config");
    config.validate().unwrap();

    assert!(config.sync.import_album_tracks);
    assert_eq!(config.sync.import_playlist_tracks, vec!["Jazz".to_string()]);
    assert!(config.sync.sync_podcast_episodes);
    assert_eq!(config.cache.expiration_secs, 60);
    assert_eq!(config.cache.memory_capacity, 500);
    assert_eq!(config.library_path, PathBuf::from("/var/lib/soul/library.json"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}
