//! In-memory cache backend for tests and cache-less runs.

use super::{BackendStats, CacheBackend, CachedRecord};
use crate::error::StorageError;
use crate::types::RecordID;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<RecordID, CachedRecord>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<CachedRecord>, StorageError> {
        Ok(self.entries.read().get(id).cloned())
    }

    fn put(&self, entry: &CachedRecord) -> Result<(), StorageError> {
        self.entries.write().insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<CachedRecord>, StorageError> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.write().clear();
        Ok(())
    }

    fn stats(&self) -> Result<BackendStats, StorageError> {
        let entries = self.entries.read();
        Ok(BackendStats {
            record_count: entries.len(),
            body_count: entries.values().filter(|e| e.has_body()).count(),
            total_size_bytes: entries
                .values()
                .map(|e| e.approximate_size() as u64)
                .sum(),
        })
    }
}
