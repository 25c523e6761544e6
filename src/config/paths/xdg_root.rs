//! XDG Base Directory utilities for the config file location.

use crate::error::ApiError;
use std::path::PathBuf;

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        ApiError::Config("Could not determine XDG config home directory (HOME not set)".to_string())
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/hoyofiles/config.toml`; the file need not exist
pub fn config_file_path() -> Result<PathBuf, ApiError> {
    Ok(config_home()?.join("hoyofiles").join("config.toml"))
}
