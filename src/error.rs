//! Error types for the artifact vault.

use thiserror::Error;

/// Storage-level failures raised by cache backends.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cache backend not initialized")]
    NotInitialized,
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Errors surfaced by the vault and its collaborators.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Decrypted header did not deserialize into record metadata.
    #[error("Invalid header data for {id}: {reason}")]
    InvalidHeaderData { id: String, reason: String },

    /// Body envelope or plaintext could not be interpreted.
    #[error("Invalid body data for {id}: {reason}")]
    InvalidBodyData { id: String, reason: String },

    /// Authentication tag mismatch or malformed ciphertext.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Body decrypted to empty content.
    #[error("No body content for {0}")]
    NoBodyContent(String),

    #[error("Offline cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Lookup of an id that is not in the store.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// No decryption key available (caller is unauthenticated).
    #[error("No decryption key available")]
    NoKey,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for VaultError {
    fn from(err: config::ConfigError) -> Self {
        VaultError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(err: reqwest::Error) -> Self {
        VaultError::TransportFailure(err.to_string())
    }
}

impl VaultError {
    /// Whether the failure only affects offline availability.
    pub fn is_cache_failure(&self) -> bool {
        matches!(
            self,
            VaultError::CacheUnavailable(_) | VaultError::StorageError(_)
        )
    }
}
