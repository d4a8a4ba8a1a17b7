use artifact_vault::cache::{BackendStats, CacheBackend, CachedRecord, OfflineCacheCoordinator};
use artifact_vault::config::CacheConfig;
use artifact_vault::crypto::{CryptoAdapter, Key};
use artifact_vault::error::{StorageError, VaultError};
use artifact_vault::keys::StaticKeyProvider;
use artifact_vault::transport::{RecordTransport, RemoteBody, RemoteEnvelope};
use artifact_vault::ArtifactVault;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// In-memory remote that seals fixtures with a known key and counts calls
pub struct FakeTransport {
    key: Key,
    envelopes: Mutex<Vec<RemoteEnvelope>>,
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    fail_records: AtomicBool,
    body_gate: Mutex<Option<Arc<Semaphore>>>,
    record_calls: AtomicUsize,
    body_calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new(key: &Key) -> Self {
        Self {
            key: key.clone(),
            envelopes: Mutex::new(Vec::new()),
            bodies: Mutex::new(HashMap::new()),
            fail_records: AtomicBool::new(false),
            body_gate: Mutex::new(None),
            record_calls: AtomicUsize::new(0),
            body_calls: AtomicUsize::new(0),
        }
    }

    /// Add a record whose header is sealed from `header`
    pub fn add(
        &self,
        id: &str,
        header: serde_json::Value,
        body: Option<&[u8]>,
        seq: u64,
        updated_secs: i64,
    ) {
        let sealed = CryptoAdapter::new()
            .seal_envelope(header.to_string().as_bytes(), &self.key)
            .unwrap();
        self.add_raw(envelope(id, sealed, seq, updated_secs));
        if let Some(body) = body {
            self.bodies.lock().insert(id.to_string(), body.to_vec());
        }
    }

    pub fn add_raw(&self, envelope: RemoteEnvelope) {
        self.envelopes.lock().push(envelope);
    }

    pub fn set_fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    /// Block body fetches until permits are added to the returned semaphore
    pub fn gate_bodies(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.body_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub fn body_calls(&self) -> usize {
        self.body_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordTransport for FakeTransport {
    async fn fetch_records(&self, _scope_id: &str) -> Result<Vec<RemoteEnvelope>, VaultError> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(VaultError::TransportFailure("connection refused".to_string()));
        }
        Ok(self.envelopes.lock().clone())
    }

    async fn fetch_body(&self, id: &str) -> Result<RemoteBody, VaultError> {
        self.body_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.body_gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| VaultError::TransportFailure(e.to_string()))?;
        }
        let plaintext = self
            .bodies
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::TransportFailure(format!("404 for {}", id)))?;
        Ok(RemoteBody {
            encrypted_body: CryptoAdapter::new().seal_envelope(&plaintext, &self.key)?,
        })
    }
}

pub fn envelope(id: &str, encrypted_header: String, seq: u64, updated_secs: i64) -> RemoteEnvelope {
    RemoteEnvelope {
        id: id.to_string(),
        encrypted_header,
        header_version: 1,
        body_version: 1,
        seq,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        updated_at: Utc.timestamp_opt(1_700_000_000 + updated_secs, 0).unwrap(),
    }
}

pub fn header(title: &str, path: Option<&str>, sessions: &[&str]) -> serde_json::Value {
    json!({
        "title": title,
        "path": path,
        "session_ids": sessions,
    })
}

/// Transport preloaded with three records in session `s1`
pub fn three_record_transport(key: &Key) -> FakeTransport {
    let transport = FakeTransport::new(key);
    transport.add(
        "1",
        header("Main", Some("src/main.rs"), &["s1"]),
        Some(b"fn main() {}"),
        1,
        10,
    );
    transport.add(
        "2",
        header("Quarterly Report", Some("docs/Report.PDF"), &["s1"]),
        Some(b"%PDF-1.7"),
        2,
        30,
    );
    transport.add(
        "3",
        header("Notes", None, &["s1", "s2"]),
        Some(b"remember the milk"),
        3,
        20,
    );
    transport
}

pub fn vault_for(transport: &Arc<FakeTransport>, key: Option<Key>) -> ArtifactVault {
    ArtifactVault::new(transport.clone(), Arc::new(StaticKeyProvider::new(key)))
}

pub fn vault_with_cache(
    transport: &Arc<FakeTransport>,
    key: Option<Key>,
    backend: Arc<dyn CacheBackend>,
) -> (Arc<OfflineCacheCoordinator>, ArtifactVault) {
    let cache = Arc::new(OfflineCacheCoordinator::new(backend, &CacheConfig::default()));
    cache.initialize().unwrap();
    let vault = vault_for(transport, key).with_cache(cache.clone());
    (cache, vault)
}

/// Backend whose writes (and optionally open) always fail
#[derive(Default)]
pub struct FailingCacheBackend {
    pub fail_open: bool,
}

impl CacheBackend for FailingCacheBackend {
    fn initialize(&self) -> Result<(), StorageError> {
        if self.fail_open {
            Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            )))
        } else {
            Ok(())
        }
    }

    fn get(&self, _id: &str) -> Result<Option<CachedRecord>, StorageError> {
        Ok(None)
    }

    fn put(&self, _entry: &CachedRecord) -> Result<(), StorageError> {
        Err(StorageError::Serialization("disk full".to_string()))
    }

    fn load_all(&self) -> Result<Vec<CachedRecord>, StorageError> {
        Ok(Vec::new())
    }

    fn clear(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn stats(&self) -> Result<BackendStats, StorageError> {
        Ok(BackendStats::default())
    }
}
