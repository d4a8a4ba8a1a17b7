//! Key provider contract and simple implementations.

use crate::crypto::Key;
use crate::error::VaultError;
use parking_lot::RwLock;

/// Environment variable read by `EnvKeyProvider`
pub const KEY_ENV_VAR: &str = "ARTIFACT_VAULT_KEY";

/// Source of the current decryption key.
///
/// Fails with `VaultError::NoKey` when the caller is unauthenticated.
pub trait KeyProvider: Send + Sync {
    fn current_key(&self) -> Result<Key, VaultError>;
}

/// In-memory key holder; set on sign-in, cleared on sign-out
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    key: RwLock<Option<Key>>,
}

impl StaticKeyProvider {
    pub fn new(key: Option<Key>) -> Self {
        Self {
            key: RwLock::new(key),
        }
    }

    pub fn set_key(&self, key: Key) {
        *self.key.write() = Some(key);
    }

    pub fn clear(&self) {
        *self.key.write() = None;
    }
}

impl KeyProvider for StaticKeyProvider {
    fn current_key(&self) -> Result<Key, VaultError> {
        self.key.read().clone().ok_or(VaultError::NoKey)
    }
}

/// Reads a hex-encoded key from the environment on every call
#[derive(Debug, Clone)]
pub struct EnvKeyProvider {
    var: String,
}

impl EnvKeyProvider {
    pub fn new() -> Self {
        Self::with_var(KEY_ENV_VAR)
    }

    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyProvider for EnvKeyProvider {
    fn current_key(&self) -> Result<Key, VaultError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Key::from_hex(&value),
            _ => Err(VaultError::NoKey),
        }
    }
}
