//! Core identifier types shared across the loader.

use std::collections::BTreeSet;
use std::fmt;

/// Game identifier as used in upstream URLs (`hk4e`, `hkrpg`, ...)
pub type GameId = String;

/// Identity of one background load task, unique for the coordinator lifetime
pub type TaskId = u64;

/// Canonical identity of one buildable file tree.
///
/// The voice-pack selection is stored as a sorted set, so two selections that
/// differ only in order or repetition compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub game: GameId,
    pub version: String,
    pub voice_packs: BTreeSet<String>,
}

impl CacheKey {
    pub fn new<I, S>(game: impl Into<String>, version: impl Into<String>, voice_packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            game: game.into(),
            version: version.into(),
            voice_packs: voice_packs.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.game, self.version)?;
        if !self.voice_packs.is_empty() {
            let voices: Vec<&str> = self.voice_packs.iter().map(String::as_str).collect();
            write!(f, "+[{}]", voices.join(","))?;
        }
        Ok(())
    }
}
