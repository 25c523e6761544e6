//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::ExplorerConfig;
use crate::error::ApiError;
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// User config file path (`$XDG_CONFIG_HOME/hoyofiles/config.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        super::xdg::config_file_path().ok()
    }

    /// Load from defaults, the user config file, and the environment; then validate.
    pub fn load() -> Result<ExplorerConfig, ApiError> {
        let config = MergeService::load(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`ConfigLoader::load`] with `path` layered above the user config file.
    pub fn load_with_file(path: &Path) -> Result<ExplorerConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = MergeService::load(Some(path))?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> ExplorerConfig {
        ExplorerConfig::default()
    }
}
