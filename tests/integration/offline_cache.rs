use std::sync::Arc;

use artifact_vault::cache::{OfflineCacheCoordinator, SledCacheBackend};
use artifact_vault::config::{CacheConfig, TransportConfig, VaultConfig};
use artifact_vault::crypto::Key;
use artifact_vault::error::VaultError;
use artifact_vault::keys::StaticKeyProvider;
use artifact_vault::store::{BodyEncoding, LoadStatus};
use artifact_vault::ArtifactVault;
use tempfile::TempDir;

use crate::integration::support::{
    header, three_record_transport, vault_for, vault_with_cache, FailingCacheBackend,
    FakeTransport,
};

fn sled_cache(dir: &TempDir) -> Arc<OfflineCacheCoordinator> {
    let backend = Arc::new(SledCacheBackend::new(dir.path().join("cache")));
    let cache = Arc::new(OfflineCacheCoordinator::new(backend, &CacheConfig::default()));
    cache.initialize().unwrap();
    cache
}

#[tokio::test]
async fn cache_hydration_goes_offline_and_live_fetch_goes_online() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));

    {
        let cache = sled_cache(&dir);
        let vault = vault_for(&transport, Some(key.clone())).with_cache(cache.clone());
        vault.fetch_records("s1").await.unwrap();
        assert!(vault.select(Some("3")).await);
        vault.shutdown().await;
    }

    let vault = vault_for(&transport, Some(key)).with_cache(sled_cache(&dir));
    assert_eq!(vault.load_from_cache(None), 3);
    assert!(vault.is_offline());
    assert_eq!(vault.record("3").unwrap().body(), Some("remember the milk"));
    assert_eq!(vault.load_status("1"), LoadStatus::HeaderDecrypted);

    vault.fetch_records("s1").await.unwrap();
    assert!(!vault.is_offline());
}

#[tokio::test]
async fn sled_round_trip_preserves_every_field() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let transport = Arc::new(FakeTransport::new(&key));
    transport.add(
        "full",
        serde_json::json!({
            "title": "Schema",
            "path": "db/schema.sql",
            "mime_type": "application/sql",
            "language": "sql",
            "session_ids": ["s1", "s9"],
        }),
        Some(b"create table t (id int);"),
        42,
        99,
    );

    let original = {
        let cache = sled_cache(&dir);
        let vault = vault_for(&transport, Some(key.clone())).with_cache(cache);
        vault.fetch_records("s1").await.unwrap();
        vault.load_body("full").await.unwrap();
        vault.shutdown().await;
        vault.record("full").unwrap()
    };

    let vault = vault_for(&transport, Some(key)).with_cache(sled_cache(&dir));
    vault.load_from_cache(Some("s9"));
    assert_eq!(vault.record("full").unwrap(), original);
    assert_eq!(original.body_encoding, BodyEncoding::Text);
}

#[tokio::test]
async fn session_hydration_only_loads_matching_records() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let backend = Arc::new(artifact_vault::cache::MemoryCacheBackend::new());
    let (cache, vault) = vault_with_cache(&transport, Some(key), backend);
    vault.fetch_records("s1").await.unwrap();
    cache.flush().await.unwrap();

    vault.clear();
    assert_eq!(vault.load_from_cache(Some("s2")), 1);
    assert!(vault.record("3").is_some());
    assert_eq!(vault.load_from_cache(Some("nobody")), 0);
    assert_eq!(vault.record_count(), 1);
}

#[tokio::test]
async fn cache_write_failure_does_not_affect_live_state() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let backend = Arc::new(FailingCacheBackend::default());
    let (cache, vault) = vault_with_cache(&transport, Some(key), backend);

    assert_eq!(vault.fetch_records("s1").await.unwrap(), 3);
    assert!(vault.select(Some("1")).await);
    cache.flush().await.unwrap();

    assert_eq!(vault.record_count(), 3);
    assert!(!vault.is_offline());
    assert_eq!(vault.error_message(), None);
    let stats = vault.cache_stats().unwrap();
    assert_eq!(stats.failed_writes, 3);
    assert_eq!(stats.last_error.as_deref(), Some("Serialization error: disk full"));
}

#[tokio::test]
async fn unopenable_cache_degrades_to_online_only() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let cache = Arc::new(OfflineCacheCoordinator::new(
        Arc::new(FailingCacheBackend { fail_open: true }),
        &CacheConfig::default(),
    ));
    assert!(matches!(cache.initialize(), Err(VaultError::CacheUnavailable(_))));

    let vault = vault_for(&transport, Some(key)).with_cache(cache);
    assert_eq!(vault.fetch_records("s1").await.unwrap(), 3);
    assert_eq!(vault.load_from_cache(None), 0);
    assert!(!vault.cache_stats().unwrap().available);
    assert!(matches!(
        vault.clear_cache().await,
        Err(VaultError::CacheUnavailable(_))
    ));
}

#[tokio::test]
async fn clear_discards_in_flight_body() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let gate = transport.gate_bodies();
    let backend = Arc::new(artifact_vault::cache::MemoryCacheBackend::new());
    let (cache, vault) = vault_with_cache(&transport, Some(key), backend.clone());
    vault.fetch_records("s1").await.unwrap();
    cache.flush().await.unwrap();

    let (loaded, _) = tokio::join!(vault.load_body("1"), async {
        vault.clear();
        gate.add_permits(1);
    });
    assert!(!loaded.unwrap());
    cache.flush().await.unwrap();

    assert_eq!(vault.load_from_cache(None), 3);
    assert!(!vault.record("1").unwrap().is_body_loaded());
}

#[tokio::test]
async fn store_clear_keeps_queued_header_writes() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let backend = Arc::new(artifact_vault::cache::MemoryCacheBackend::new());
    let (cache, vault) = vault_with_cache(&transport, Some(key), backend.clone());

    vault.fetch_records("s1").await.unwrap();
    vault.clear();
    cache.flush().await.unwrap();

    assert_eq!(backend.len(), 3);
    assert_eq!(cache.stats().fenced_writes, 0);
    assert_eq!(vault.load_from_cache(None), 3);
    assert!(vault.is_offline());
}

#[tokio::test]
async fn header_refresh_keeps_body_of_same_version() {
    let key = Key::generate();
    let transport = Arc::new(FakeTransport::new(&key));
    transport.add("a", header("A", Some("a.md"), &["s1"]), Some(b"body"), 1, 0);
    let backend = Arc::new(artifact_vault::cache::MemoryCacheBackend::new());
    let (cache, vault) = vault_with_cache(&transport, Some(key), backend);

    vault.fetch_records("s1").await.unwrap();
    vault.load_body("a").await.unwrap();
    vault.fetch_records("s1").await.unwrap();
    assert!(!vault.record("a").unwrap().is_body_loaded());
    cache.flush().await.unwrap();

    vault.clear();
    vault.load_from_cache(None);
    assert_eq!(vault.record("a").unwrap().body(), Some("body"));
}

#[tokio::test]
async fn clear_cache_empties_persisted_records() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let backend = Arc::new(artifact_vault::cache::MemoryCacheBackend::new());
    let (_, vault) = vault_with_cache(&transport, Some(key), backend.clone());
    vault.fetch_records("s1").await.unwrap();

    vault.clear_cache().await.unwrap();
    vault.flush_cache().await.unwrap();
    assert!(backend.is_empty());
    assert_eq!(vault.record_count(), 3);
}

#[tokio::test]
async fn vault_from_config_opens_sled_cache() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let config = VaultConfig {
        cache: CacheConfig {
            path: Some(dir.path().join("vault-cache")),
            ..CacheConfig::default()
        },
        transport: TransportConfig {
            max_concurrent_body_loads: 2,
            ..TransportConfig::default()
        },
        ..VaultConfig::default()
    };
    let transport = Arc::new(three_record_transport(&key));
    let vault = ArtifactVault::from_config(
        &config,
        transport,
        Arc::new(StaticKeyProvider::new(Some(key))),
    )
    .unwrap();

    vault.fetch_records("s1").await.unwrap();
    vault.flush_cache().await.unwrap();
    let stats = vault.cache_stats().unwrap();
    assert!(stats.available);
    assert_eq!(stats.record_count, 3);
    assert!(dir.path().join("vault-cache").exists());
}
