//! Record Views
//!
//! Derived, never-stored read views over the record store: filtered and
//! sorted lists, classification groups, and per-session ordering.

use crate::store::{Classification, Record, RecordStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

/// Filter applied to the record list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Case-insensitive substring matched against title, path, and language
    pub query: String,
    /// Only records with this classification when set
    pub classification: Option<Classification>,
}

impl RecordFilter {
    pub fn new(query: impl Into<String>, classification: Option<Classification>) -> Self {
        Self {
            query: query.into(),
            classification,
        }
    }

    /// Whether a record passes both the classification and the search query
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(classification) = self.classification {
            if record.classification != classification {
                return false;
            }
        }
        let query = normalize(self.query.trim());
        if query.is_empty() {
            return true;
        }
        std::iter::once(Some(record.title.as_str()))
            .chain([record.path.as_deref(), record.language.as_deref()])
            .flatten()
            .any(|field| normalize(field).contains(&query))
    }
}

fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Filter then sort descending by last update. Ties fall back to id order.
pub fn filtered_sorted<'a>(store: &'a RecordStore, filter: &RecordFilter) -> Vec<&'a Record> {
    let mut records: Vec<&Record> = store.all().filter(|r| filter.matches(r)).collect();
    records.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

/// One list per classification tag, including empty lists for unused tags
pub fn grouped_by_classification(store: &RecordStore) -> BTreeMap<Classification, Vec<&Record>> {
    let mut groups: BTreeMap<Classification, Vec<&Record>> = Classification::ALL
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();
    for record in store.all() {
        groups.entry(record.classification).or_default().push(record);
    }
    for records in groups.values_mut() {
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
    }
    groups
}

/// Records associated with a session, ascending by sequence number
pub fn by_session<'a>(store: &'a RecordStore, session_id: &str) -> Vec<&'a Record> {
    let mut records: Vec<&Record> = store
        .all()
        .filter(|r| r.session_ids.contains(session_id))
        .collect();
    records.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.id.cmp(&b.id)));
    records
}
