//! Manifest loading pipeline
//!
//! Fetch -> decode -> build for one cache key, with a cancellation checkpoint
//! before every network call, inside decoding, and before the tree build.
//! Decoding and building run on the blocking pool.

use crate::concurrency::CancelFlag;
use crate::config::{ExplorerConfig, GameConfig};
use crate::error::ApiError;
use crate::manifest::{decode_manifest, FileRecord, ManifestClient, VersionCatalog};
use crate::tree::{FileTree, FileTreeBuilder};
use crate::types::CacheKey;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress sink for advisory status text
pub type ProgressFn = Arc<dyn Fn(String) + Send + Sync>;

/// A built tree plus the voice packs that could not be merged into it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeResult {
    pub tree: FileTree,
    /// `ApiError::PartialVoicePack` entries, in selection order
    pub voice_pack_failures: Vec<ApiError>,
}

impl TreeResult {
    pub fn is_complete(&self) -> bool {
        self.voice_pack_failures.is_empty()
    }
}

/// Resolved voice-pack selection for one game
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceSelection {
    /// (label, manifest file name)
    pub files: Vec<(String, String)>,
    /// Labels not offered for the game or without a file name
    pub skipped: Vec<String>,
}

/// Loads catalogs and trees through a [`ManifestClient`]
#[derive(Clone)]
pub struct ManifestLoader {
    client: Arc<dyn ManifestClient>,
    games: Arc<BTreeMap<String, GameConfig>>,
    voice_files: Arc<BTreeMap<String, String>>,
    game_manifest: Arc<str>,
}

impl ManifestLoader {
    pub fn new(client: Arc<dyn ManifestClient>, config: &ExplorerConfig) -> Self {
        Self {
            client,
            games: Arc::new(config.games.clone()),
            voice_files: Arc::new(config.voice_packs.clone()),
            game_manifest: Arc::from(config.api.game_manifest.as_str()),
        }
    }

    pub fn client(&self) -> &Arc<dyn ManifestClient> {
        &self.client
    }

    pub fn game(&self, game: &str) -> Result<&GameConfig, ApiError> {
        self.games
            .get(game)
            .ok_or_else(|| ApiError::UnknownGame(game.to_string()))
    }

    /// Map labels to manifest file names, skipping what the game does not offer.
    pub fn resolve_voices<'a, I>(&self, game: &str, labels: I) -> Result<VoiceSelection, ApiError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let config = self.game(game)?;
        let mut selection = VoiceSelection::default();
        for label in labels {
            match self.voice_files.get(label) {
                Some(file) if config.offers_voice(label) => {
                    selection.files.push((label.clone(), file.clone()));
                }
                _ => {
                    warn!(game, voice = %label, "Voice pack not available, skipping");
                    selection.skipped.push(label.clone());
                }
            }
        }
        Ok(selection)
    }

    /// Fetch the version catalog of `game`.
    pub async fn load_catalog(&self, game: &str, cancel: &CancelFlag) -> Result<VersionCatalog, ApiError> {
        self.game(game)?;
        cancel.check()?;
        let start = Instant::now();
        let catalog = self.client.fetch_version_catalog(game).await?;
        cancel.check()?;
        info!(
            game,
            versions = catalog.len(),
            duration_ms = start.elapsed().as_millis(),
            "Loaded version catalog"
        );
        Ok(catalog)
    }

    /// Fetch, decode, and build the tree for `key`.
    ///
    /// A failing voice pack is recorded in the result and the load continues;
    /// a failing game manifest fails the whole load.
    pub async fn load_tree(
        &self,
        key: &CacheKey,
        cancel: &CancelFlag,
        progress: &ProgressFn,
    ) -> Result<TreeResult, ApiError> {
        let start = Instant::now();
        let selection = self.resolve_voices(&key.game, &key.voice_packs)?;
        let mut voice_pack_failures: Vec<ApiError> = selection
            .skipped
            .iter()
            .map(|voice| ApiError::PartialVoicePack {
                voice: voice.clone(),
                message: format!("not available for {}", key.game),
            })
            .collect();

        progress("Loading game file list...".to_string());
        let mut records = self
            .fetch_records(&key.game, &key.version, &self.game_manifest, cancel)
            .await?;

        for (voice, file_name) in &selection.files {
            progress(format!("Loading voice pack: {}...", voice));
            match self.fetch_records(&key.game, &key.version, file_name, cancel).await {
                Ok(voice_records) => records.extend(voice_records),
                Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                Err(e) => {
                    warn!(key = %key, voice = %voice, error = %e, "Voice pack failed");
                    voice_pack_failures.push(ApiError::PartialVoicePack {
                        voice: voice.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        cancel.check()?;
        progress(format!("Building file tree ({} records)...", records.len()));
        let tree = tokio::task::spawn_blocking(move || FileTreeBuilder::build(records))
            .await
            .map_err(|e| ApiError::Task(e.to_string()))?;
        cancel.check()?;

        info!(
            key = %key,
            files = tree.file_count,
            total_size = tree.total_size,
            failed_voice_packs = voice_pack_failures.len(),
            duration_ms = start.elapsed().as_millis(),
            "Loaded file tree"
        );
        Ok(TreeResult {
            tree,
            voice_pack_failures,
        })
    }

    async fn fetch_records(
        &self,
        game: &str,
        version: &str,
        file_name: &str,
        cancel: &CancelFlag,
    ) -> Result<Vec<FileRecord>, ApiError> {
        cancel.check()?;
        let payload = self
            .client
            .fetch_manifest_payload(game, version, file_name)
            .await?;
        cancel.check()?;

        let decode_cancel = cancel.clone();
        let records = tokio::task::spawn_blocking(move || decode_manifest(&payload, &decode_cancel))
            .await
            .map_err(|e| ApiError::Task(e.to_string()))??;
        debug!(game, version, file_name, records = records.len(), "Decoded manifest");
        Ok(records)
    }
}
