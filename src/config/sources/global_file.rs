//! User config file source (`$XDG_CONFIG_HOME/hoyofiles/config.toml`), optional

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use tracing::debug;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Ok(path) = xdg::config_file_path() else {
        return Ok(builder);
    };
    debug!(path = %path.display(), exists = path.exists(), "User config file");
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
}
