//! MergeService: orchestrates sources and deserializes to ExplorerConfig.

use crate::config::sources::{environment, explicit_file, global_file};
use crate::config::ExplorerConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: serde defaults (lowest) -> global file -> explicit file -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<ExplorerConfig, ConfigError> {
        let builder = Config::builder();
        let builder = global_file::add_to_builder(builder)?;
        let builder = match explicit {
            Some(path) => explicit_file::add_to_builder(builder, path)?,
            None => builder,
        };
        let builder = environment::add_to_builder(builder)?;
        Self::finish(builder)
    }

    /// Merge exactly the given file over the defaults, skipping global and environment sources.
    pub fn load_isolated(path: &Path) -> Result<ExplorerConfig, ConfigError> {
        let builder = explicit_file::add_to_builder(Config::builder(), path)?;
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<ExplorerConfig, ConfigError> {
        let config = builder.build()?;
        config.try_deserialize()
    }
}
