//! CLI Tooling
//!
//! Command-line front end over the load coordinator. Every command that
//! touches the network runs as a coordinator task and reads its result from
//! the event channel, the same way an interactive front end would.

use crate::cache::LoadCache;
use crate::config::{ConfigLoader, ExplorerConfig};
use crate::coordinator::{LoadCoordinator, LoadEvent, LoadEventKind, TaskHandle};
use crate::error::ApiError;
use crate::loader::{ManifestLoader, TreeResult};
use crate::manifest::{HttpManifestClient, ManifestClient, VersionCatalog};
use crate::tooling::format;
use crate::tree::search;
use crate::types::CacheKey;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;

/// hoyofiles - browse the remote file manifests of live game titles
#[derive(Parser, Debug)]
#[command(name = "hoyofiles", version)]
#[command(about = "Browse game package manifests as a directory tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the user config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List configured games and their voice packs
    Games,
    /// List published versions, newest first
    Versions {
        game: String,
    },
    /// Show game and update packages of a version
    Packages {
        game: String,
        /// Version label (default: latest)
        #[arg(long)]
        version: Option<String>,
    },
    /// Load and print the file tree of a version
    Files {
        game: String,
        /// Version label (default: latest)
        #[arg(long)]
        version: Option<String>,
        /// Voice pack to include, e.g. 英语 (repeatable)
        #[arg(long = "voice")]
        voices: Vec<String>,
        /// Only show this directory
        #[arg(long)]
        path: Option<String>,
        /// Maximum directory depth to expand
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Search file paths by keyword (case-insensitive)
    Search {
        game: String,
        keyword: String,
        /// Version label (default: latest)
        #[arg(long)]
        version: Option<String>,
        /// Voice pack to include (repeatable)
        #[arg(long = "voice")]
        voices: Vec<String>,
        /// Maximum results to list (default: loader.search_result_cap)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fetch version catalogs of several games concurrently
    Preload {
        /// Games to preload (default: all configured)
        games: Vec<String>,
    },
}

impl Cli {
    /// Load configuration and fold the logging flags into it.
    pub fn resolve_config(&self) -> Result<ExplorerConfig, ApiError> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_with_file(path)?,
            None => ConfigLoader::load()?,
        };
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if self.log_file.is_some() {
            config.logging.file = self.log_file.clone();
        }
        Ok(config)
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Games => "games",
        Commands::Versions { .. } => "versions",
        Commands::Packages { .. } => "packages",
        Commands::Files { .. } => "files",
        Commands::Search { .. } => "search",
        Commands::Preload { .. } => "preload",
    }
}

/// Terminal event of a task plus the non-progress events seen before it
struct TaskOutcome {
    terminal: LoadEventKind,
    events: Vec<LoadEventKind>,
}

/// CLI context owning the coordinator and its event stream
pub struct CliContext {
    config: ExplorerConfig,
    coordinator: LoadCoordinator,
    events: mpsc::UnboundedReceiver<LoadEvent>,
    show_progress: bool,
}

impl CliContext {
    /// Create a context talking to the configured HTTP endpoints.
    pub fn new(config: ExplorerConfig) -> Result<Self, ApiError> {
        let client = Arc::new(HttpManifestClient::new(&config.api)?);
        Ok(Self::with_client(config, client))
    }

    /// Create a context over any [`ManifestClient`].
    pub fn with_client(config: ExplorerConfig, client: Arc<dyn ManifestClient>) -> Self {
        let loader = ManifestLoader::new(client, &config);
        let (coordinator, events) =
            LoadCoordinator::new(loader, Arc::new(LoadCache::new()), config.loader.clone());
        Self {
            config,
            coordinator,
            events,
            show_progress: std::io::stderr().is_terminal(),
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &LoadCoordinator {
        &self.coordinator
    }

    /// Execute a CLI command and return its rendered output.
    pub async fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command).await;
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis(),
            "Command finished"
        );
        result
    }

    /// Cancel outstanding work; bounded by `loader.shutdown_timeout_ms`.
    pub async fn shutdown(&self) {
        let timeout = Duration::from_millis(self.config.loader.shutdown_timeout_ms);
        self.coordinator.shutdown(timeout).await;
    }

    async fn execute_inner(&mut self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Games => Ok(format::format_games(&self.config)),
            Commands::Versions { game } => {
                let catalog = self.versions(game).await?;
                Ok(format::format_versions(game, &catalog))
            }
            Commands::Packages { game, version } => {
                let catalog = self.versions(game).await?;
                let version = pick_version(game, &catalog, version.as_deref())?;
                let descriptor = catalog.get(&version).ok_or_else(|| ApiError::UnknownVersion {
                    game: game.clone(),
                    version: version.clone(),
                })?;
                Ok(format::format_packages(game, &version, descriptor))
            }
            Commands::Files {
                game,
                version,
                voices,
                path,
                depth,
            } => {
                let (catalog, key, result) = self.files(game, version.as_deref(), voices).await?;
                let download_base = catalog
                    .get(&key.version)
                    .and_then(|d| d.decompressed_path.as_deref());

                let prefix = path
                    .as_deref()
                    .map(|p| p.trim_matches(|c| c == '/' || c == '\\'))
                    .unwrap_or("");
                let dir = result.tree.root.lookup(prefix).ok_or_else(|| {
                    ApiError::NotFound(format!("directory '{}' in {}", prefix, key))
                })?;

                let mut out = format::format_tree_summary(&key, &result);
                out.push_str(&format::format_tree(dir, prefix, *depth, download_base));
                Ok(out)
            }
            Commands::Search {
                game,
                keyword,
                version,
                voices,
                limit,
            } => {
                let (catalog, key, result) = self.files(game, version.as_deref(), voices).await?;
                let download_base = catalog
                    .get(&key.version)
                    .and_then(|d| d.decompressed_path.as_deref());
                let cap = limit.unwrap_or(self.config.loader.search_result_cap);
                let results = search(&result.tree.root, keyword, cap);
                Ok(format::format_search(keyword, &results, download_base))
            }
            Commands::Preload { games } => {
                let games: Vec<String> = if games.is_empty() {
                    self.config.game_ids().map(str::to_string).collect()
                } else {
                    games.clone()
                };
                let handle = self.coordinator.preload_all(games);
                let outcome = self.run(&handle).await?;

                let rows: Vec<(String, Option<ApiError>)> = outcome
                    .events
                    .into_iter()
                    .filter_map(|kind| match kind {
                        LoadEventKind::PreloadProgress { game, error, .. } => Some((game, error)),
                        _ => None,
                    })
                    .collect();
                match outcome.terminal {
                    LoadEventKind::PreloadFinished { all_succeeded, .. } => {
                        Ok(format::format_preload(&rows, all_succeeded))
                    }
                    other => Err(unexpected(other)),
                }
            }
        }
    }

    async fn versions(&mut self, game: &str) -> Result<Arc<VersionCatalog>, ApiError> {
        let handle = self.coordinator.load_versions(game)?;
        match self.run(&handle).await?.terminal {
            LoadEventKind::VersionsLoaded { catalog, .. } => Ok(catalog),
            other => Err(unexpected(other)),
        }
    }

    async fn files(
        &mut self,
        game: &str,
        version: Option<&str>,
        voices: &[String],
    ) -> Result<(Arc<VersionCatalog>, CacheKey, Arc<TreeResult>), ApiError> {
        let catalog = self.versions(game).await?;
        let version = pick_version(game, &catalog, version)?;
        let handle = self.coordinator.load_files(game, &version, voices.iter().cloned())?;
        match self.run(&handle).await?.terminal {
            LoadEventKind::FilesLoaded { key, result } => Ok((catalog, key, result)),
            other => Err(unexpected(other)),
        }
    }

    /// Drain events until `handle`'s task emits its terminal event.
    async fn run(&mut self, handle: &TaskHandle) -> Result<TaskOutcome, ApiError> {
        let mut events = Vec::new();
        loop {
            let event = self
                .events
                .recv()
                .await
                .ok_or_else(|| ApiError::Task("load event channel closed".to_string()))?;
            if event.task != handle.id() {
                continue;
            }
            match event.kind {
                LoadEventKind::Progress(text) => {
                    if self.show_progress {
                        eprintln!("{}", text.dimmed());
                    }
                }
                LoadEventKind::Warning(text) => {
                    eprintln!("{} {}", "warning:".yellow().bold(), text);
                }
                LoadEventKind::Failed(e) => return Err(e),
                kind @ (LoadEventKind::VersionsLoaded { .. }
                | LoadEventKind::FilesLoaded { .. }
                | LoadEventKind::PreloadFinished { .. }) => {
                    return Ok(TaskOutcome {
                        terminal: kind,
                        events,
                    })
                }
                kind @ LoadEventKind::PreloadProgress { .. } => events.push(kind),
            }
        }
    }
}

/// Requested version, or the newest one when none was given.
fn pick_version(game: &str, catalog: &VersionCatalog, requested: Option<&str>) -> Result<String, ApiError> {
    let unknown = |version: &str| ApiError::UnknownVersion {
        game: game.to_string(),
        version: version.to_string(),
    };
    match requested {
        Some(version) if catalog.get(version).is_some() => Ok(version.to_string()),
        Some(version) => Err(unknown(version)),
        None => catalog
            .latest()
            .map(str::to_string)
            .ok_or_else(|| unknown("latest")),
    }
}

fn unexpected(kind: LoadEventKind) -> ApiError {
    ApiError::Task(format!("unexpected load event: {:?}", kind))
}
