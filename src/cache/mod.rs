//! Offline Cache
//!
//! Mirrors decrypted records into a persisted store so the vault can keep
//! working when the remote service is unreachable. Caching is strictly an
//! optimization: writes are best-effort and never block the live path.

pub mod coordinator;
pub mod memory;
pub mod sled_backend;

pub use coordinator::{CacheStats, OfflineCacheCoordinator};
pub use memory::MemoryCacheBackend;
pub use sled_backend::SledCacheBackend;

use crate::error::StorageError;
use crate::store::{BodyEncoding, Record, RecordHeader, RecordMeta};
use crate::types::{RecordID, SessionID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted form of a record: header fields plus the body once loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub id: RecordID,
    pub title: String,
    pub path: Option<String>,
    pub mime_type: Option<String>,
    pub language: Option<String>,
    pub session_ids: Vec<SessionID>,
    pub body: Option<String>,
    pub body_encoding: BodyEncoding,
    /// BLAKE3 digest of the body, checked on load
    pub body_digest: Option<[u8; 32]>,
    pub header_version: u64,
    pub body_version: u64,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
}

impl CachedRecord {
    pub fn from_record(record: &Record) -> Self {
        let mut entry = Self {
            id: record.id.clone(),
            title: record.title.clone(),
            path: record.path.clone(),
            mime_type: record.mime_type.clone(),
            language: record.language.clone(),
            session_ids: record.session_ids.iter().cloned().collect(),
            body: None,
            body_encoding: record.body_encoding,
            body_digest: None,
            header_version: record.header_version,
            body_version: record.body_version,
            seq: record.seq,
            created_at: record.created_at,
            updated_at: record.updated_at,
            cached_at: Utc::now(),
        };
        if let Some(body) = record.body() {
            entry.set_body(body.to_string(), record.body_encoding);
        }
        entry
    }

    pub fn set_body(&mut self, body: String, encoding: BodyEncoding) {
        self.body_digest = Some(*blake3::hash(body.as_bytes()).as_bytes());
        self.body = Some(body);
        self.body_encoding = encoding;
        self.cached_at = Utc::now();
    }

    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|b| !b.is_empty())
    }

    fn body_is_intact(&self) -> bool {
        match (&self.body, &self.body_digest) {
            (Some(body), Some(digest)) => blake3::hash(body.as_bytes()).as_bytes() == digest,
            _ => false,
        }
    }

    /// Rebuild the in-memory record. A body failing its digest check is dropped.
    pub fn into_record(self) -> Record {
        let intact = self.body_is_intact();
        let header = RecordHeader {
            title: self.title,
            path: self.path,
            mime_type: self.mime_type,
            language: self.language,
            session_ids: self.session_ids,
        };
        let meta = RecordMeta {
            header_version: self.header_version,
            body_version: self.body_version,
            seq: self.seq,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        let mut record = Record::new(self.id, header, meta);
        if let Some(body) = self.body {
            if !intact {
                warn!(id = %record.id, "Cached body failed integrity check, dropping body");
            } else if let Err(e) = record.set_body(body, self.body_encoding) {
                warn!(id = %record.id, error = %e, "Ignoring cached body");
            }
        }
        record
    }

    /// Approximate encoded size for statistics
    pub fn approximate_size(&self) -> usize {
        self.id.len()
            + self.title.len()
            + self.path.as_ref().map_or(0, |p| p.len())
            + self.mime_type.as_ref().map_or(0, |m| m.len())
            + self.language.as_ref().map_or(0, |l| l.len())
            + self.session_ids.iter().map(|s| s.len()).sum::<usize>()
            + self.body.as_ref().map_or(0, |b| b.len())
    }
}

/// Aggregate counts reported by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    pub record_count: usize,
    pub body_count: usize,
    pub total_size_bytes: u64,
}

/// Persisted key-value store keyed by record id.
///
/// Calls are synchronous; the coordinator serializes writes on its worker.
pub trait CacheBackend: Send + Sync {
    /// Open the underlying storage. Must be idempotent.
    fn initialize(&self) -> Result<(), StorageError>;

    fn get(&self, id: &str) -> Result<Option<CachedRecord>, StorageError>;

    fn put(&self, entry: &CachedRecord) -> Result<(), StorageError>;

    fn load_all(&self) -> Result<Vec<CachedRecord>, StorageError>;

    fn load_for_session(&self, session_id: &str) -> Result<Vec<CachedRecord>, StorageError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|entry| entry.session_ids.iter().any(|s| s == session_id))
            .collect())
    }

    fn clear(&self) -> Result<(), StorageError>;

    fn stats(&self) -> Result<BackendStats, StorageError>;

    /// Persist buffered writes
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
