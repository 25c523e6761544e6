//! hoyofiles: remote game manifest explorer
//!
//! Fetches per-game version catalogs and flat file manifests, turns them into
//! directory trees with aggregated sizes, and keeps every load cancellable,
//! debounced, and cached for the life of the process.

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod tooling;
pub mod tree;
pub mod types;

pub use cache::LoadCache;
pub use coordinator::{LoadCoordinator, LoadEvent, LoadEventKind, Slot, TaskHandle, TaskState};
pub use error::ApiError;
pub use loader::{ManifestLoader, TreeResult};
