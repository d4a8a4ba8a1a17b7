//! Sled-backed cache store.
//!
//! One tree keyed by record id; values are bincode-encoded `CachedRecord`s.

use super::{BackendStats, CacheBackend, CachedRecord};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ARTIFACT_TREE: &str = "artifacts";

pub struct SledCacheBackend {
    path: PathBuf,
    tree: RwLock<Option<sled::Tree>>,
}

impl SledCacheBackend {
    /// Backend that opens a database at `path` on `initialize`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tree: RwLock::new(None),
        }
    }

    /// Wrap an already-open database
    pub fn from_db(db: &sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(ARTIFACT_TREE)?;
        Ok(Self {
            path: PathBuf::new(),
            tree: RwLock::new(Some(tree)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tree(&self) -> Result<sled::Tree, StorageError> {
        self.tree.read().clone().ok_or(StorageError::NotInitialized)
    }

    fn decode(bytes: &[u8]) -> Result<CachedRecord, StorageError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl CacheBackend for SledCacheBackend {
    fn initialize(&self) -> Result<(), StorageError> {
        let mut guard = self.tree.write();
        if guard.is_some() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.path)?;
        let db = sled::open(&self.path)?;
        *guard = Some(db.open_tree(ARTIFACT_TREE)?);
        debug!(path = %self.path.display(), "Opened artifact cache");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<CachedRecord>, StorageError> {
        match self.tree()?.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, entry: &CachedRecord) -> Result<(), StorageError> {
        let bytes = bincode::serialize(entry)?;
        self.tree()?.insert(entry.id.as_bytes(), bytes)?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<CachedRecord>, StorageError> {
        let tree = self.tree()?;
        let mut entries = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (key, value) = item?;
            match Self::decode(&value) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "Skipping unreadable cache entry"
                ),
            }
        }
        Ok(entries)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let tree = self.tree()?;
        tree.clear()?;
        tree.flush()?;
        Ok(())
    }

    fn stats(&self) -> Result<BackendStats, StorageError> {
        let tree = self.tree()?;
        let mut stats = BackendStats::default();
        for item in tree.iter() {
            let (_, value) = item?;
            stats.record_count += 1;
            stats.total_size_bytes += value.len() as u64;
            if let Ok(entry) = Self::decode(&value) {
                if entry.has_body() {
                    stats.body_count += 1;
                }
            }
        }
        Ok(stats)
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.tree()?.flush()?;
        Ok(())
    }
}
