//! Error types shared by the fetch, build, and load layers.

use thiserror::Error;

/// Errors surfaced by manifest fetching, cache builds, and background loads.
///
/// Every payload is owned text so the error is `Clone`: one in-flight build
/// hands the same error to every caller attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network failure, timeout, or non-2xx response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed JSON or ndjson payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// One voice pack of a multi-pack load failed; the rest of the load continues
    #[error("Voice pack [{voice}] failed to load: {message}")]
    PartialVoicePack { voice: String, message: String },

    /// The task was cancelled; never shown to the user as a failure
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    /// A spawned build or decode task panicked or was aborted
    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Unknown version {version} for game {game}")]
    UnknownVersion { game: String, version: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// True for the cancellation marker, which callers swallow instead of reporting.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}
