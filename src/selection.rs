//! Selection/Filter Controller
//!
//! Owns the current selection, search query, and classification filter.
//! Selecting a record whose body is not loaded yields a load ticket from the
//! deduplicator; the caller performs the fetch while holding it.

use crate::concurrency::{LoadDeduplicator, LoadTicket};
use crate::hierarchy::HierarchyNode;
use crate::store::{Classification, RecordStore};
use crate::types::RecordID;
use crate::views::RecordFilter;
use serde::Serialize;

/// Snapshot of selection and filter state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub selected_id: Option<RecordID>,
    pub search_query: String,
    pub classification_filter: Option<Classification>,
}

impl SelectionState {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter::new(self.search_query.clone(), self.classification_filter)
    }
}

/// Result of a selection change
#[derive(Debug)]
pub enum SelectionOutcome {
    /// Selection cleared; nothing to fetch
    Cleared,
    /// Record selected. `fetch` is present when a body fetch must be dispatched.
    Selected {
        id: RecordID,
        fetch: Option<LoadTicket>,
    },
}

impl SelectionOutcome {
    pub fn needs_fetch(&self) -> bool {
        matches!(self, SelectionOutcome::Selected { fetch: Some(_), .. })
    }
}

/// Selection and filter controller
#[derive(Debug)]
pub struct SelectionController {
    state: SelectionState,
    dedup: LoadDeduplicator,
}

impl SelectionController {
    pub fn new(dedup: LoadDeduplicator) -> Self {
        Self {
            state: SelectionState::default(),
            dedup,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.state.selected_id.as_deref()
    }

    /// Change the selection.
    ///
    /// Selecting `None` clears without side effects. Selecting an id that is
    /// unknown to the store records the selection but dispatches nothing.
    pub fn select(&mut self, id: Option<&str>, store: &RecordStore) -> SelectionOutcome {
        let Some(id) = id else {
            self.state.selected_id = None;
            return SelectionOutcome::Cleared;
        };
        self.state.selected_id = Some(id.to_string());
        let fetch = if store.contains(id) {
            self.dedup.try_begin(id, store.is_body_loaded(id))
        } else {
            None
        };
        SelectionOutcome::Selected {
            id: id.to_string(),
            fetch,
        }
    }

    /// Select from a hierarchy node. Directories are a no-op and return None.
    pub fn select_node(
        &mut self,
        node: &HierarchyNode,
        store: &RecordStore,
    ) -> Option<SelectionOutcome> {
        node.record_id().map(|id| self.select(Some(id), store))
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.state.search_query = query.into();
    }

    pub fn set_classification_filter(&mut self, classification: Option<Classification>) {
        self.state.classification_filter = classification;
    }

    /// Drop the selection, keeping query and filter
    pub fn clear_selection(&mut self) {
        self.state.selected_id = None;
    }
}
