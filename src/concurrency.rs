//! Load deduplication for body fetches
//!
//! Tracks in-flight body fetches per record so that at most one fetch per
//! identifier is outstanding, and a loaded body is never fetched again.
//! Scoped per identifier; there is no global ordering.

use crate::types::RecordID;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Per-record in-flight tracker
#[derive(Debug, Clone, Default)]
pub struct LoadDeduplicator {
    /// Identifiers with an outstanding body fetch
    in_flight: Arc<Mutex<HashSet<RecordID>>>,
}

impl LoadDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` in flight.
    ///
    /// Returns false (and marks nothing) when the body is already loaded or
    /// another fetch for `id` is outstanding; the caller must skip the fetch.
    pub fn begin_load(&self, id: &str, already_loaded: bool) -> bool {
        if already_loaded {
            return false;
        }
        self.in_flight.lock().insert(id.to_string())
    }

    /// Clear the in-flight mark. Always called on completion or failure.
    pub fn end_load(&self, id: &str) {
        self.in_flight.lock().remove(id);
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.in_flight.lock().contains(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Begin a load and return a guard that ends it when dropped
    pub fn try_begin(&self, id: &str, already_loaded: bool) -> Option<LoadTicket> {
        if self.begin_load(id, already_loaded) {
            Some(LoadTicket {
                dedup: self.clone(),
                id: id.to_string(),
            })
        } else {
            None
        }
    }
}

/// Guard for an in-flight load; clears the mark on drop, including when the
/// owning future is cancelled.
#[derive(Debug)]
pub struct LoadTicket {
    dedup: LoadDeduplicator,
    id: RecordID,
}

impl LoadTicket {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for LoadTicket {
    fn drop(&mut self) {
        self.dedup.end_load(&self.id);
    }
}
