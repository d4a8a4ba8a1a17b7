//! Artifact Vault: Encrypted Artifact Retrieval with Offline Cache
//!
//! Fetches end-to-end encrypted artifact records from a remote service,
//! decrypts headers in all-or-nothing batches, loads bodies on demand with
//! per-record deduplication, and mirrors everything into a persisted cache so
//! the index stays browsable offline.

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod keys;
pub mod logging;
pub mod selection;
pub mod store;
pub mod tooling;
pub mod transport;
pub mod types;
pub mod vault;
pub mod views;

pub use error::VaultError;
pub use vault::ArtifactVault;
