//! Configuration
//!
//! Layered configuration for the vault: built-in defaults, the global config
//! file, an optional explicit file, then `ARTIFACT_VAULT__*` environment
//! variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod storage_paths;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use storage_paths::CacheConfig;

use crate::error::VaultError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_body_loads() -> usize {
    4
}

/// Remote transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the artifact service; transport is unavailable when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Scope fetched when the CLI is not given one
    #[serde(default)]
    pub default_scope: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on concurrent body loads during prefetch
    #[serde(default = "default_max_concurrent_body_loads")]
    pub max_concurrent_body_loads: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_scope: None,
            timeout_secs: default_timeout_secs(),
            max_concurrent_body_loads: default_max_concurrent_body_loads(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VaultConfig {
    /// Reject values that would make the vault unusable
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.cache.queue_capacity == 0 {
            return Err(VaultError::ConfigError(
                "cache.queue_capacity must be positive".to_string(),
            ));
        }
        if self.transport.timeout_secs == 0 {
            return Err(VaultError::ConfigError(
                "transport.timeout_secs must be positive".to_string(),
            ));
        }
        if self.transport.max_concurrent_body_loads == 0 {
            return Err(VaultError::ConfigError(
                "transport.max_concurrent_body_loads must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
