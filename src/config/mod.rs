//! Configuration
//!
//! Layered configuration: built-in defaults, the user config file under
//! `$XDG_CONFIG_HOME/hoyofiles/`, an optional explicit file, then
//! `HOYOFILES__*` environment overrides.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upstream endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Tried once when a catalog fetch against `base_url` fails
    pub fallback_url: Option<String>,
    pub list_timeout_secs: u64,
    pub manifest_timeout_secs: u64,
    /// Manifest file holding the base game files of a version
    pub game_manifest: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://autopatch.hk4e.com/pkg_version".to_string(),
            fallback_url: None,
            list_timeout_secs: 10,
            manifest_timeout_secs: 30,
            game_manifest: "pkg_version".to_string(),
        }
    }
}

/// Background load behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub debounce_ms: u64,
    pub search_result_cap: usize,
    /// Upper bound on waiting for tasks to stop at shutdown
    pub shutdown_timeout_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            search_result_cap: 500,
            shutdown_timeout_ms: 2000,
        }
    }
}

/// One browsable game title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    /// Voice-pack labels offered for this game
    #[serde(default)]
    pub voices: Vec<String>,
}

impl GameConfig {
    fn new(name: &str, short_name: &str, voices: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            short_name: Some(short_name.to_string()),
            voices: voices.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }

    pub fn offers_voice(&self, label: &str) -> bool {
        self.voices.iter().any(|v| v == label)
    }
}

fn default_games() -> BTreeMap<String, GameConfig> {
    let four_voices = ["汉语", "英语", "日语", "韩语"];
    BTreeMap::from([
        ("hk4e".to_string(), GameConfig::new("原神", "GI", &four_voices)),
        ("hkrpg".to_string(), GameConfig::new("崩坏·星穹铁道", "HSR", &[])),
        ("nap".to_string(), GameConfig::new("绝区零", "ZZZ", &four_voices)),
        ("bh3".to_string(), GameConfig::new("崩坏3", "HI3", &[])),
    ])
}

fn default_voice_packs() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("汉语".to_string(), "Audio_Chinese_pkg_version".to_string()),
        ("英语".to_string(), "Audio_English(US)_pkg_version".to_string()),
        ("日语".to_string(), "Audio_Japanese_pkg_version".to_string()),
        ("韩语".to_string(), "Audio_Korean_pkg_version".to_string()),
    ])
}

fn default_game_id() -> String {
    "hk4e".to_string()
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default = "default_game_id")]
    pub default_game: String,

    #[serde(default = "default_games")]
    pub games: BTreeMap<String, GameConfig>,

    /// Voice label -> manifest file name
    #[serde(default = "default_voice_packs")]
    pub voice_packs: BTreeMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            loader: LoaderConfig::default(),
            default_game: default_game_id(),
            games: default_games(),
            voice_packs: default_voice_packs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExplorerConfig {
    pub fn game(&self, id: &str) -> Result<&GameConfig, ApiError> {
        self.games
            .get(id)
            .ok_or_else(|| ApiError::UnknownGame(id.to_string()))
    }

    pub fn game_ids(&self) -> impl Iterator<Item = &str> {
        self.games.keys().map(String::as_str)
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<(), ApiError> {
        check_url("api.base_url", &self.api.base_url)?;
        if let Some(fallback) = self.api.fallback_url.as_deref() {
            if !fallback.trim().is_empty() {
                check_url("api.fallback_url", fallback)?;
            }
        }
        if self.api.list_timeout_secs == 0 || self.api.manifest_timeout_secs == 0 {
            return Err(ApiError::Config(
                "Request timeouts must be at least one second".to_string(),
            ));
        }
        if self.api.game_manifest.trim().is_empty() {
            return Err(ApiError::Config("api.game_manifest is empty".to_string()));
        }
        if self.games.is_empty() {
            return Err(ApiError::Config("No games configured".to_string()));
        }
        if !self.games.contains_key(&self.default_game) {
            return Err(ApiError::Config(format!(
                "default_game '{}' is not in the games table",
                self.default_game
            )));
        }
        for (id, game) in &self.games {
            for voice in &game.voices {
                if !self.voice_packs.contains_key(voice) {
                    return Err(ApiError::Config(format!(
                        "Game '{}' offers voice pack '{}' but voice_packs has no file for it",
                        id, voice
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_url(field: &str, url: &str) -> Result<(), ApiError> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(ApiError::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}
