//! XDG Base Directory utilities for vault data and configuration.

use crate::error::VaultError;
use std::path::PathBuf;

/// Application directory name under the XDG roots
pub const APP_DIR: &str = "artifact-vault";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise defaults to `$HOME/.local/share`
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, VaultError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        VaultError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// Data directory for the vault: `$XDG_DATA_HOME/artifact-vault/`
pub fn data_dir() -> Result<PathBuf, VaultError> {
    let data_home = data_home().ok_or_else(|| {
        VaultError::ConfigError(
            "Could not determine XDG data home directory (HOME not set)".to_string(),
        )
    })?;
    Ok(data_home.join(APP_DIR))
}

/// Global config file path: `$XDG_CONFIG_HOME/artifact-vault/config.toml`
pub fn global_config_file() -> Result<PathBuf, VaultError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}
