//! Artifact Vault
//!
//! Ties the record store, crypto adapter, load deduplicator, offline cache,
//! and selection controller together behind one `&self` API. Locks are
//! `parking_lot` and are never held across an await point, so the vault can
//! be shared as `Arc<ArtifactVault>` between tasks.

use crate::cache::{CacheStats, OfflineCacheCoordinator, SledCacheBackend};
use crate::concurrency::{LoadDeduplicator, LoadTicket};
use crate::config::VaultConfig;
use crate::crypto::{decode_envelope, CryptoAdapter, Key};
use crate::error::VaultError;
use crate::events::{EventBus, VaultEvent};
use crate::hierarchy::{self, HierarchyNode};
use crate::keys::KeyProvider;
use crate::selection::{SelectionController, SelectionOutcome, SelectionState};
use crate::store::{
    decode_body_plaintext, BodyEncoding, Classification, LoadStatus, Record, RecordHeader,
    RecordStore,
};
use crate::transport::{RecordTransport, RemoteEnvelope};
use crate::types::{Generation, RecordID};
use crate::views;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const DEFAULT_MAX_CONCURRENT_BODY_LOADS: usize = 4;

pub struct ArtifactVault {
    store: RwLock<RecordStore>,
    selection: RwLock<SelectionController>,
    dedup: LoadDeduplicator,
    transport: Arc<dyn RecordTransport>,
    keys: Arc<dyn KeyProvider>,
    cache: Option<Arc<OfflineCacheCoordinator>>,
    crypto: CryptoAdapter,
    events: EventBus,
    error: RwLock<Option<String>>,
    offline: AtomicBool,
    max_concurrent_body_loads: usize,
}

impl ArtifactVault {
    /// Vault without an offline cache
    pub fn new(transport: Arc<dyn RecordTransport>, keys: Arc<dyn KeyProvider>) -> Self {
        let dedup = LoadDeduplicator::new();
        Self {
            store: RwLock::new(RecordStore::new()),
            selection: RwLock::new(SelectionController::new(dedup.clone())),
            dedup,
            transport,
            keys,
            cache: None,
            crypto: CryptoAdapter::new(),
            events: EventBus::default(),
            error: RwLock::new(None),
            offline: AtomicBool::new(false),
            max_concurrent_body_loads: DEFAULT_MAX_CONCURRENT_BODY_LOADS,
        }
    }

    /// Attach an offline cache coordinator
    pub fn with_cache(mut self, cache: Arc<OfflineCacheCoordinator>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Bound concurrent body loads during prefetch (minimum 1)
    pub fn with_max_concurrent_body_loads(mut self, limit: usize) -> Self {
        self.max_concurrent_body_loads = limit.max(1);
        self
    }

    /// Build a vault from configuration, opening the sled cache when enabled.
    ///
    /// A cache that fails to open is kept in its unavailable state and the
    /// vault runs online-only. Must be called from within a tokio runtime.
    pub fn from_config(
        config: &VaultConfig,
        transport: Arc<dyn RecordTransport>,
        keys: Arc<dyn KeyProvider>,
    ) -> Result<Self, VaultError> {
        let vault = Self::new(transport, keys)
            .with_max_concurrent_body_loads(config.transport.max_concurrent_body_loads);
        if !config.cache.enabled {
            debug!("Offline cache disabled by configuration");
            return Ok(vault);
        }

        let path = config.cache.resolve_path()?;
        let backend = Arc::new(SledCacheBackend::new(path));
        let cache = Arc::new(OfflineCacheCoordinator::new(backend, &config.cache));
        if let Err(e) = cache.initialize() {
            warn!(error = %e, "Offline cache unavailable, continuing online-only");
        }
        Ok(vault.with_cache(cache))
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    /// Fetch and decrypt every record for `scope_id`.
    ///
    /// The batch commits only when every header decrypts; on success the
    /// store contents are replaced and the vault is back online. On failure
    /// the store and offline flag are untouched and the error slot is set.
    pub async fn fetch_records(&self, scope_id: &str) -> Result<usize, VaultError> {
        match self.fetch_and_decrypt(scope_id).await {
            Ok(records) => {
                let count = records.len();
                if let Some(cache) = &self.cache {
                    cache.put_all(records.iter());
                }
                self.store.write().replace_all(records);
                self.offline.store(false, Ordering::SeqCst);
                self.set_error(None);
                info!(scope = %scope_id, count, "Fetched records");
                self.events.emit(VaultEvent::RecordsReplaced {
                    count,
                    offline: false,
                });
                Ok(count)
            }
            Err(e) => {
                warn!(scope = %scope_id, error = %e, "Record fetch failed");
                self.set_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn fetch_and_decrypt(&self, scope_id: &str) -> Result<Vec<Record>, VaultError> {
        let key = self.keys.current_key()?;
        debug!(scope = %scope_id, "Requesting record envelopes");
        let envelopes = self.transport.fetch_records(scope_id).await?;
        envelopes
            .into_iter()
            .map(|envelope| self.decrypt_header(envelope, &key))
            .collect()
    }

    fn decrypt_header(&self, envelope: RemoteEnvelope, key: &Key) -> Result<Record, VaultError> {
        let sealed =
            decode_envelope(&envelope.encrypted_header).map_err(|e| VaultError::InvalidHeaderData {
                id: envelope.id.clone(),
                reason: format!("invalid base64: {}", e),
            })?;
        let plaintext = self.crypto.decrypt(&sealed, key)?;
        let header = RecordHeader::parse(&envelope.id, &plaintext)?;
        let meta = envelope.meta();
        Ok(Record::new(envelope.id, header, meta))
    }

    /// Load the body for `id` unless it is loaded, loading, or unknown.
    ///
    /// Returns `Ok(true)` when this call attached a body.
    pub async fn load_body(&self, id: &str) -> Result<bool, VaultError> {
        let ticket = {
            let store = self.store.read();
            if !store.contains(id) {
                debug!(id = %id, "Skipping body load for unknown record");
                return Ok(false);
            }
            self.dedup.try_begin(id, store.is_body_loaded(id))
        };
        match ticket {
            Some(ticket) => self.run_body_load(ticket).await,
            None => Ok(false),
        }
    }

    async fn run_body_load(&self, ticket: LoadTicket) -> Result<bool, VaultError> {
        let id = ticket.id().to_string();
        let body_version = self.store.read().get(&id).map(|r| r.body_version);
        let issued = self.cache.as_ref().map_or(0, |c| c.generation());
        self.events.emit(VaultEvent::LoadingChanged {
            id: id.clone(),
            loading: true,
        });
        debug!(id = %id, "Dispatching body fetch");

        let result = match self.fetch_body(&id).await {
            Ok((body, encoding)) => self.commit_body(&id, body, encoding, body_version, issued),
            Err(e) => Err(e),
        };

        drop(ticket);
        self.events.emit(VaultEvent::LoadingChanged {
            id: id.clone(),
            loading: false,
        });
        if let Ok(true) = result {
            self.events.emit(VaultEvent::RecordUpdated { id });
        }
        result
    }

    async fn fetch_body(&self, id: &str) -> Result<(String, BodyEncoding), VaultError> {
        let key = self.keys.current_key()?;
        let remote = self.transport.fetch_body(id).await?;
        let sealed =
            decode_envelope(&remote.encrypted_body).map_err(|e| VaultError::InvalidBodyData {
                id: id.to_string(),
                reason: format!("invalid base64: {}", e),
            })?;
        let plaintext = self.crypto.decrypt(&sealed, &key)?;
        decode_body_plaintext(id, plaintext)
    }

    /// Attach a fetched body if the record still exists at the version the
    /// fetch was dispatched for
    fn commit_body(
        &self,
        id: &str,
        body: String,
        encoding: BodyEncoding,
        dispatched_version: Option<u64>,
        issued: Generation,
    ) -> Result<bool, VaultError> {
        let mut store = self.store.write();
        let current_version = store.get(id).map(|r| r.body_version);
        if current_version.is_none() || current_version != dispatched_version {
            debug!(id = %id, "Record changed while body was in flight, discarding body");
            return Ok(false);
        }
        if !store.set_body(id, body, encoding)? {
            return Ok(false);
        }
        if let (Some(cache), Some(body)) = (&self.cache, store.get(id).and_then(Record::body)) {
            cache.put_body_issued(id, body, encoding, issued);
        }
        debug!(id = %id, "Body loaded");
        Ok(true)
    }

    /// Change the selection, fetching the body when needed.
    ///
    /// Returns true when this call loaded a body. Body failures are logged
    /// and never reach the error slot.
    pub async fn select(&self, id: Option<&str>) -> bool {
        let outcome = {
            let store = self.store.read();
            self.selection.write().select(id, &store)
        };
        self.events.emit(VaultEvent::SelectionChanged {
            id: id.map(str::to_string),
        });
        self.dispatch(outcome).await
    }

    /// Select a hierarchy node. Directories are ignored.
    pub async fn select_node(&self, node: &HierarchyNode) -> bool {
        match node.record_id() {
            Some(id) => self.select(Some(id)).await,
            None => false,
        }
    }

    async fn dispatch(&self, outcome: SelectionOutcome) -> bool {
        let SelectionOutcome::Selected {
            fetch: Some(ticket),
            ..
        } = outcome
        else {
            return false;
        };
        let id = ticket.id().to_string();
        match self.run_body_load(ticket).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(id = %id, error = %e, "Body load failed");
                false
            }
        }
    }

    /// Load many bodies concurrently, returning how many were attached
    pub async fn prefetch_bodies<I>(&self, ids: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<RecordID>,
    {
        let ids: Vec<RecordID> = ids.into_iter().map(Into::into).collect();
        let requested = ids.len();
        let loaded = stream::iter(ids)
            .map(|id| async move {
                match self.load_body(&id).await {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        warn!(id = %id, error = %e, "Prefetch body load failed");
                        false
                    }
                }
            })
            .buffer_unordered(self.max_concurrent_body_loads)
            .filter(|loaded| futures::future::ready(*loaded))
            .count()
            .await;
        info!(requested, loaded, "Prefetched bodies");
        loaded
    }

    /// Hydrate the store from the offline cache.
    ///
    /// A non-empty result replaces the store and marks the vault offline.
    /// Cache failures are logged and yield zero.
    pub fn load_from_cache(&self, session_id: Option<&str>) -> usize {
        let Some(cache) = &self.cache else {
            debug!("No offline cache configured");
            return 0;
        };
        let loaded = match session_id {
            Some(session) => cache.load_for_session(session),
            None => cache.load_all(),
        };
        let records = match loaded {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Offline cache load failed");
                return 0;
            }
        };
        let count = records.len();
        if count == 0 {
            return 0;
        }
        self.store.write().replace_all(records);
        self.offline.store(true, Ordering::SeqCst);
        info!(count, session = ?session_id, "Loaded records from offline cache");
        self.events.emit(VaultEvent::RecordsReplaced {
            count,
            offline: true,
        });
        count
    }

    /// Replace the search query used by `records` and `hierarchy`
    pub fn set_search_query(&self, query: impl Into<String>) {
        self.selection.write().set_search_query(query);
    }

    /// Restrict `records` and `hierarchy` to one kind; None shows all
    pub fn set_classification_filter(&self, classification: Option<Classification>) {
        self.selection.write().set_classification_filter(classification);
    }

    /// Snapshot of the selection and filter state
    pub fn selection(&self) -> SelectionState {
        self.selection.read().state().clone()
    }

    /// Records passing the current filter, newest first
    pub fn records(&self) -> Vec<Record> {
        let filter = self.selection.read().state().filter();
        let store = self.store.read();
        views::filtered_sorted(&store, &filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Every record partitioned by kind, including empty kinds
    pub fn grouped_records(&self) -> BTreeMap<Classification, Vec<Record>> {
        let store = self.store.read();
        views::grouped_by_classification(&store)
            .into_iter()
            .map(|(tag, records)| (tag, records.into_iter().cloned().collect()))
            .collect()
    }

    /// Records attached to `session_id`, ascending by sequence number
    pub fn records_for_session(&self, session_id: &str) -> Vec<Record> {
        let store = self.store.read();
        views::by_session(&store, session_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Directory tree over the records passing the current filter
    pub fn hierarchy(&self) -> Vec<HierarchyNode> {
        let filter = self.selection.read().state().filter();
        let store = self.store.read();
        hierarchy::build(views::filtered_sorted(&store, &filter))
    }

    /// Clone of one record, if present
    pub fn record(&self, id: &str) -> Option<Record> {
        self.store.read().get(id).cloned()
    }

    /// Number of records in the store
    pub fn record_count(&self) -> usize {
        self.store.read().len()
    }

    /// Load status of `id`; unknown ids are `Unfetched`
    pub fn load_status(&self, id: &str) -> LoadStatus {
        self.store.read().load_status(id)
    }

    /// Whether a body fetch for `id` is in flight
    pub fn is_loading(&self, id: &str) -> bool {
        self.dedup.is_loading(id)
    }

    /// True while the store holds cache-hydrated records
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Last fetch error, cleared by the next successful fetch
    pub fn error_message(&self) -> Option<String> {
        self.error.read().clone()
    }

    /// Cache statistics; None when no cache is configured
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Drop every record, the selection, and the error slot.
    ///
    /// In-flight body loads are not cancelled; their results are discarded
    /// because the record is gone. Cache writes already queued still land.
    pub fn clear(&self) {
        self.store.write().clear();
        self.selection.write().clear_selection();
        self.offline.store(false, Ordering::SeqCst);
        self.set_error(None);
        info!("Vault cleared");
        self.events.emit(VaultEvent::Cleared);
    }

    /// Erase the persisted cache; the in-memory store is left as is
    pub async fn clear_cache(&self) -> Result<(), VaultError> {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => Err(VaultError::CacheUnavailable(
                "no offline cache configured".to_string(),
            )),
        }
    }

    /// Wait for queued cache writes to land
    pub async fn flush_cache(&self) -> Result<(), VaultError> {
        match &self.cache {
            Some(cache) if cache.is_available() => cache.flush().await,
            _ => Ok(()),
        }
    }

    /// Drain queued cache writes and stop the cache worker
    pub async fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            cache.shutdown().await;
        }
    }

    fn set_error(&self, message: Option<String>) {
        let changed = {
            let mut slot = self.error.write();
            if *slot == message {
                false
            } else {
                *slot = message.clone();
                true
            }
        };
        if changed {
            self.events.emit(VaultEvent::ErrorChanged { message });
        }
    }
}
