//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::VaultConfig;
use crate::error::VaultError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, an optional explicit file, and environment.
    pub fn load(explicit: Option<&Path>) -> Result<VaultConfig, VaultError> {
        let config = MergeService::load(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file with environment overlay only.
    pub fn load_from_file(path: &Path) -> Result<VaultConfig, VaultError> {
        let config = MergeService::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> VaultConfig {
        VaultConfig::default()
    }
}
