//! CacheConfig and cache path resolution.

use crate::config::xdg;
use crate::error::VaultError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1024
}

/// Offline cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the offline cache is used at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache database directory; None means the XDG data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Pending background writes before new writes are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Discard queued writes issued before the last clear
    #[serde(default = "default_true")]
    pub fence_stale_writes: bool,
}

impl CacheConfig {
    /// Resolve the cache directory, falling back to `$XDG_DATA_HOME/artifact-vault/cache`.
    pub fn resolve_path(&self) -> Result<PathBuf, VaultError> {
        match &self.path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
            _ => Ok(xdg::data_dir()?.join("cache")),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: None,
            queue_capacity: default_queue_capacity(),
            fence_stale_writes: default_true(),
        }
    }
}
