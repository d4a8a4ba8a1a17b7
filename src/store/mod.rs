//! Record Store
//!
//! In-memory index of decrypted artifact records keyed by identifier.
//! Mutation is expected from a single logical owner; callers that share the
//! store wrap it in a lock.

pub mod record;

pub use record::{
    decode_body_plaintext, BodyEncoding, Classification, LoadStatus, Record, RecordHeader,
    RecordMeta,
};

use crate::error::VaultError;
use crate::types::RecordID;
use std::collections::HashMap;

/// In-memory record index
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<RecordID, Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record in place, returning the previous value.
    ///
    /// The previous body is not carried over.
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.id.clone(), record)
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Iterate all records in unspecified order
    pub fn all(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn remove(&mut self, id: &str) -> Option<Record> {
        self.records.remove(id)
    }

    /// Replace the whole index with a freshly committed batch
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records.clear();
        for record in records {
            self.upsert(record);
        }
    }

    /// Attach body content to an existing record.
    ///
    /// Returns `Ok(false)` when the record is no longer present.
    pub fn set_body(
        &mut self,
        id: &str,
        body: String,
        encoding: BodyEncoding,
    ) -> Result<bool, VaultError> {
        match self.records.get_mut(id) {
            Some(record) => {
                record.set_body(body, encoding)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the record exists and already has body content
    pub fn is_body_loaded(&self, id: &str) -> bool {
        self.get(id).is_some_and(Record::is_body_loaded)
    }

    pub fn load_status(&self, id: &str) -> LoadStatus {
        self.get(id)
            .map(Record::load_status)
            .unwrap_or(LoadStatus::Unfetched)
    }
}
