//! Offline cache coordinator.
//!
//! Reads go straight to the backend. Writes are enqueued on a bounded channel
//! and applied in order by a single background worker, so callers never wait
//! on disk. Each write carries the cache generation current when it was
//! issued; `clear` bumps the generation and, when fencing is enabled, older
//! writes still in the queue are discarded.

use super::{CacheBackend, CachedRecord};
use crate::config::CacheConfig;
use crate::error::{StorageError, VaultError};
use crate::store::{BodyEncoding, Record};
use crate::types::{Generation, RecordID};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Whether the backend was opened successfully
    pub available: bool,
    pub record_count: usize,
    pub body_count: usize,
    pub total_size_bytes: u64,
    pub completed_writes: u64,
    pub failed_writes: u64,
    /// Writes discarded because the queue was full or closed
    pub dropped_writes: u64,
    /// Writes discarded because they predate the last clear
    pub fenced_writes: u64,
    pub generation: Generation,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct WriteStats {
    completed_writes: u64,
    failed_writes: u64,
    dropped_writes: u64,
    fenced_writes: u64,
    last_error: Option<String>,
}

enum CacheJob {
    Put {
        entries: Vec<CachedRecord>,
        generation: Generation,
    },
    PutBody {
        id: RecordID,
        body: String,
        encoding: BodyEncoding,
        generation: Generation,
    },
    Clear {
        done: oneshot::Sender<Result<(), StorageError>>,
    },
    Flush {
        done: oneshot::Sender<Result<(), StorageError>>,
    },
}

/// State shared between the coordinator and its worker
struct Shared {
    backend: Arc<dyn CacheBackend>,
    generation: AtomicU64,
    stats: RwLock<WriteStats>,
    fence_stale_writes: bool,
}

impl Shared {
    fn is_stale(&self, issued_at: Generation) -> bool {
        self.fence_stale_writes && issued_at < self.generation.load(Ordering::SeqCst)
    }

    fn record_result(&self, id: &str, result: Result<(), StorageError>) {
        let mut stats = self.stats.write();
        match result {
            Ok(()) => stats.completed_writes += 1,
            Err(e) => {
                warn!(id = %id, error = %e, "Cache write failed");
                stats.failed_writes += 1;
                stats.last_error = Some(e.to_string());
            }
        }
    }

    fn record_failure(&self, error: &StorageError) {
        self.stats.write().last_error = Some(error.to_string());
    }

    /// Write a header entry, keeping a cached body of the same body version
    fn write_entry(&self, mut entry: CachedRecord) -> Result<(), StorageError> {
        if !entry.has_body() {
            if let Some(existing) = self.backend.get(&entry.id)? {
                if existing.has_body() && existing.body_version == entry.body_version {
                    entry.body = existing.body;
                    entry.body_digest = existing.body_digest;
                    entry.body_encoding = existing.body_encoding;
                }
            }
        }
        self.backend.put(&entry)
    }

    fn write_body(&self, id: &str, body: String, encoding: BodyEncoding) -> Result<(), StorageError> {
        match self.backend.get(id)? {
            Some(mut entry) => {
                entry.set_body(body, encoding);
                self.backend.put(&entry)
            }
            None => {
                debug!(id = %id, "No cached header for body, skipping");
                Ok(())
            }
        }
    }
}

/// Best-effort mirror of the record store
pub struct OfflineCacheCoordinator {
    shared: Arc<Shared>,
    queue_capacity: usize,
    sender: RwLock<Option<mpsc::Sender<CacheJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineCacheCoordinator {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                generation: AtomicU64::new(0),
                stats: RwLock::new(WriteStats::default()),
                fence_stale_writes: config.fence_stale_writes,
            }),
            queue_capacity: config.queue_capacity.max(1),
            sender: RwLock::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Open the backend and start the write worker. Idempotent.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(&self) -> Result<(), VaultError> {
        let mut sender = self.sender.write();
        if sender.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            VaultError::CacheUnavailable("no async runtime available".to_string())
        })?;

        if let Err(e) = self.shared.backend.initialize() {
            self.shared.record_failure(&e);
            warn!(error = %e, "Failed to open offline cache");
            return Err(VaultError::CacheUnavailable(e.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let shared = Arc::clone(&self.shared);
        *self.worker.lock() = Some(runtime.spawn(Self::worker_loop(rx, shared)));
        *sender = Some(tx);

        info!(
            queue_capacity = self.queue_capacity,
            fence_stale_writes = self.shared.fence_stale_writes,
            "Offline cache initialized"
        );
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.sender.read().is_some()
    }

    pub fn generation(&self) -> Generation {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Advance the generation so writes issued earlier become stale
    pub fn bump_generation(&self) -> Generation {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn load_all(&self) -> Result<Vec<Record>, VaultError> {
        self.ensure_available()?;
        let entries = self.shared.backend.load_all().map_err(|e| self.unavailable(e))?;
        Ok(entries.into_iter().map(CachedRecord::into_record).collect())
    }

    pub fn load_for_session(&self, session_id: &str) -> Result<Vec<Record>, VaultError> {
        self.ensure_available()?;
        let entries = self
            .shared
            .backend
            .load_for_session(session_id)
            .map_err(|e| self.unavailable(e))?;
        Ok(entries.into_iter().map(CachedRecord::into_record).collect())
    }

    /// Queue a single record write
    pub fn put(&self, record: &Record) -> bool {
        self.put_all(std::iter::once(record))
    }

    /// Queue a batch of record writes as one job
    pub fn put_all<'a, I>(&self, records: I) -> bool
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let entries: Vec<CachedRecord> = records.into_iter().map(CachedRecord::from_record).collect();
        if entries.is_empty() {
            return true;
        }
        let count = entries.len() as u64;
        self.enqueue(
            CacheJob::Put {
                entries,
                generation: self.generation(),
            },
            count,
        )
    }

    /// Queue a body write at the current generation
    pub fn put_body(&self, id: &str, body: &str, encoding: BodyEncoding) -> bool {
        self.put_body_issued(id, body, encoding, self.generation())
    }

    /// Queue a body write issued at `generation`, e.g. when the fetch started
    pub fn put_body_issued(
        &self,
        id: &str,
        body: &str,
        encoding: BodyEncoding,
        generation: Generation,
    ) -> bool {
        self.enqueue(
            CacheJob::PutBody {
                id: id.to_string(),
                body: body.to_string(),
                encoding,
                generation,
            },
            1,
        )
    }

    /// Remove every cached entry and fence writes issued before the call
    pub async fn clear(&self) -> Result<(), VaultError> {
        self.bump_generation();
        let result = self.round_trip(|done| CacheJob::Clear { done }).await;
        if result.is_ok() {
            info!(generation = self.generation(), "Offline cache cleared");
        }
        result
    }

    /// Wait until every write queued so far has been applied and persisted
    pub async fn flush(&self) -> Result<(), VaultError> {
        self.round_trip(|done| CacheJob::Flush { done }).await
    }

    /// Stop the worker after it drains the queue
    pub async fn shutdown(&self) {
        self.sender.write().take();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache worker terminated abnormally");
            }
            if let Err(e) = self.shared.backend.flush() {
                self.shared.record_failure(&e);
                warn!(error = %e, "Failed to flush offline cache on shutdown");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let available = self.is_available();
        let backend = if available {
            match self.shared.backend.stats() {
                Ok(stats) => stats,
                Err(e) => {
                    self.shared.record_failure(&e);
                    Default::default()
                }
            }
        } else {
            Default::default()
        };
        let writes = self.shared.stats.read();
        CacheStats {
            available,
            record_count: backend.record_count,
            body_count: backend.body_count,
            total_size_bytes: backend.total_size_bytes,
            completed_writes: writes.completed_writes,
            failed_writes: writes.failed_writes,
            dropped_writes: writes.dropped_writes,
            fenced_writes: writes.fenced_writes,
            generation: self.generation(),
            last_error: writes.last_error.clone(),
        }
    }

    fn ensure_available(&self) -> Result<(), VaultError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(VaultError::CacheUnavailable(
                "offline cache is not initialized".to_string(),
            ))
        }
    }

    fn unavailable(&self, error: StorageError) -> VaultError {
        self.shared.record_failure(&error);
        VaultError::CacheUnavailable(error.to_string())
    }

    fn enqueue(&self, job: CacheJob, count: u64) -> bool {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            debug!("Offline cache not initialized, skipping write");
            return false;
        };
        match tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.shared.stats.write().dropped_writes += count;
                warn!(
                    queue_capacity = self.queue_capacity,
                    "Cache write queue is full, dropping write"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.stats.write().dropped_writes += count;
                warn!("Cache worker stopped, dropping write");
                false
            }
        }
    }

    async fn round_trip<F>(&self, make_job: F) -> Result<(), VaultError>
    where
        F: FnOnce(oneshot::Sender<Result<(), StorageError>>) -> CacheJob,
    {
        let tx = self.sender.read().clone().ok_or_else(|| {
            VaultError::CacheUnavailable("offline cache is not initialized".to_string())
        })?;
        let (done, wait) = oneshot::channel();
        tx.send(make_job(done))
            .await
            .map_err(|_| VaultError::CacheUnavailable("cache worker stopped".to_string()))?;
        let result = wait
            .await
            .map_err(|_| VaultError::CacheUnavailable("cache worker stopped".to_string()))?;
        result.map_err(|e| self.unavailable(e))
    }

    async fn worker_loop(mut rx: mpsc::Receiver<CacheJob>, shared: Arc<Shared>) {
        debug!("Cache worker started");

        while let Some(job) = rx.recv().await {
            match job {
                CacheJob::Put {
                    entries,
                    generation,
                } => {
                    if shared.is_stale(generation) {
                        shared.stats.write().fenced_writes += entries.len() as u64;
                        debug!(count = entries.len(), generation, "Discarding stale cache writes");
                        continue;
                    }
                    for entry in entries {
                        let id = entry.id.clone();
                        let result = shared.write_entry(entry);
                        shared.record_result(&id, result);
                    }
                }
                CacheJob::PutBody {
                    id,
                    body,
                    encoding,
                    generation,
                } => {
                    if shared.is_stale(generation) {
                        shared.stats.write().fenced_writes += 1;
                        debug!(id = %id, generation, "Discarding stale body write");
                        continue;
                    }
                    let result = shared.write_body(&id, body, encoding);
                    shared.record_result(&id, result);
                }
                CacheJob::Clear { done } => {
                    let result = shared.backend.clear();
                    if let Err(e) = &result {
                        shared.record_failure(e);
                    }
                    let _ = done.send(result);
                }
                CacheJob::Flush { done } => {
                    let _ = done.send(shared.backend.flush());
                }
            }
        }

        debug!("Cache worker stopped");
    }
}
