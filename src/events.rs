//! Vault change notifications.
//!
//! The presentation layer subscribes to a broadcast channel instead of
//! observing state implicitly. Lagging subscribers miss events and should
//! re-read the vault's state.

use crate::types::RecordID;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default channel capacity
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change event emitted by the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Store contents replaced by a live fetch or cache hydration
    RecordsReplaced { count: usize, offline: bool },
    /// A single record changed in place (body loaded)
    RecordUpdated { id: RecordID },
    SelectionChanged { id: Option<RecordID> },
    LoadingChanged { id: RecordID, loading: bool },
    /// Error slot changed; None when cleared
    ErrorChanged { message: Option<String> },
    Cleared,
}

/// Sender half wrapper; sending with no subscribers is not an error
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VaultEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: VaultEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
