//! Load Cache
//!
//! Process-lifetime memoization of built file trees and fetched version
//! catalogs. A key is either completed (returned immediately) or has exactly
//! one in-flight build that every concurrent caller attaches to.

use crate::error::ApiError;
use crate::loader::TreeResult;
use crate::manifest::VersionCatalog;
use crate::types::{CacheKey, GameId};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type SharedBuild<V> = Shared<BoxFuture<'static, Result<Arc<V>, ApiError>>>;

enum Entry<V> {
    Ready(Arc<V>),
    Loading { build_id: u64, build: SharedBuild<V> },
}

/// Unbounded keyed cache with at-most-one concurrent build per key.
///
/// Failed builds are not stored. The lock is never held across an await.
pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    next_build: AtomicU64,
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Builds are spawned onto the ambient tokio runtime.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_build: AtomicU64::new(1),
        }
    }

    /// Completed value for `key`, if any. Never triggers a build.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match self.entries.lock().get(key) {
            Some(Entry::Ready(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn is_loading(&self, key: &K) -> bool {
        matches!(self.entries.lock().get(key), Some(Entry::Loading { .. }))
    }

    /// Number of completed entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| matches!(entry, Entry::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value, attach to the in-flight build, or start `build`.
    ///
    /// `build` is invoked only when no completed or in-flight entry exists. A
    /// caller that attached to someone else's build which ended in
    /// `Cancelled` starts its own build instead of inheriting the cancellation.
    pub async fn get_or_build<F, Fut>(&self, key: K, build: F) -> Result<Arc<V>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let mut build = Some(build);
        loop {
            let (build_id, shared, owner) = {
                let mut entries = self.entries.lock();
                match entries.get(&key) {
                    Some(Entry::Ready(value)) => return Ok(Arc::clone(value)),
                    Some(Entry::Loading { build_id, build }) => (*build_id, build.clone(), false),
                    None => {
                        let start = build.take().ok_or(ApiError::Cancelled)?;
                        let build_id = self.next_build.fetch_add(1, Ordering::Relaxed);
                        // Spawned so the build keeps going when every waiter is dropped
                        let handle = tokio::spawn(start());
                        let shared = async move {
                            match handle.await {
                                Ok(result) => result.map(Arc::new),
                                Err(e) => Err(ApiError::Task(e.to_string())),
                            }
                        }
                        .boxed()
                        .shared();
                        entries.insert(
                            key.clone(),
                            Entry::Loading {
                                build_id,
                                build: shared.clone(),
                            },
                        );
                        (build_id, shared, true)
                    }
                }
            };

            if !owner {
                debug!(build_id, "Attached to in-flight build");
            }
            let result = shared.await;

            {
                let mut entries = self.entries.lock();
                let still_ours = matches!(
                    entries.get(&key),
                    Some(Entry::Loading { build_id: current, .. }) if *current == build_id
                );
                if still_ours {
                    match &result {
                        Ok(value) => {
                            entries.insert(key.clone(), Entry::Ready(Arc::clone(value)));
                        }
                        Err(_) => {
                            entries.remove(&key);
                        }
                    }
                }
            }

            match result {
                Err(ApiError::Cancelled) if !owner && build.is_some() => continue,
                other => return other,
            }
        }
    }
}

/// Trees keyed by (game, version, voice selection) and catalogs keyed by game
#[derive(Default)]
pub struct LoadCache {
    trees: KeyedCache<CacheKey, TreeResult>,
    catalogs: KeyedCache<GameId, VersionCatalog>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_build<F, Fut>(&self, key: CacheKey, build: F) -> Result<Arc<TreeResult>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TreeResult, ApiError>> + Send + 'static,
    {
        self.trees.get_or_build(key, build).await
    }

    pub async fn get_or_fetch_catalog<F, Fut>(
        &self,
        game: &str,
        fetch: F,
    ) -> Result<Arc<VersionCatalog>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VersionCatalog, ApiError>> + Send + 'static,
    {
        self.catalogs.get_or_build(game.to_string(), fetch).await
    }

    pub fn tree(&self, key: &CacheKey) -> Option<Arc<TreeResult>> {
        self.trees.get(key)
    }

    pub fn version_catalog(&self, game: &str) -> Option<Arc<VersionCatalog>> {
        self.catalogs.get(&game.to_string())
    }

    pub fn trees(&self) -> &KeyedCache<CacheKey, TreeResult> {
        &self.trees
    }

    pub fn catalogs(&self) -> &KeyedCache<GameId, VersionCatalog> {
        &self.catalogs
    }
}
