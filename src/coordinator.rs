//! Background load coordination
//!
//! Every load runs as a task in a slot. Starting a task cancels whatever was
//! active in the same slot, so only the newest selection can surface a
//! result. Interactive loads wait out a debounce window first; a newer task
//! wakes and ends them before they touch the network.
//!
//! Results go out on one event channel. An event is sent only while its task
//! is still the current occupant of the slot, checked under the slot-table
//! lock, so a superseded task can never overwrite a newer one's result.

use crate::cache::LoadCache;
use crate::concurrency::CancelFlag;
use crate::config::LoaderConfig;
use crate::error::ApiError;
use crate::loader::{ManifestLoader, ProgressFn, TreeResult};
use crate::manifest::VersionCatalog;
use crate::types::{CacheKey, GameId, TaskId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Logical task identity; at most one active task per slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    VersionList,
    FileList,
    /// The whole fan-out preload batch
    Preload,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::VersionList => write!(f, "version-list"),
            Slot::FileList => write!(f, "file-list"),
            Slot::Preload => write!(f, "preload"),
        }
    }
}

/// Task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting out the debounce window
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub enum LoadEventKind {
    Progress(String),
    VersionsLoaded {
        game: GameId,
        catalog: Arc<VersionCatalog>,
    },
    FilesLoaded {
        key: CacheKey,
        result: Arc<TreeResult>,
    },
    /// Non-fatal problem, e.g. a voice pack that failed to load
    Warning(String),
    Failed(ApiError),
    /// One game of a preload batch finished
    PreloadProgress {
        game: GameId,
        error: Option<ApiError>,
        completed: usize,
        total: usize,
    },
    PreloadFinished {
        all_succeeded: bool,
        failed_games: Vec<GameId>,
    },
}

impl LoadEventKind {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoadEventKind::VersionsLoaded { .. }
                | LoadEventKind::FilesLoaded { .. }
                | LoadEventKind::Failed(_)
                | LoadEventKind::PreloadFinished { .. }
        )
    }
}

/// Event delivered to the front end, tagged with the task that produced it
#[derive(Debug, Clone)]
pub struct LoadEvent {
    pub task: TaskId,
    pub slot: Slot,
    pub kind: LoadEventKind,
}

/// What a task loads; equal targets in the same slot share one running task
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Catalog(GameId),
    Tree(CacheKey),
}

struct TaskControl {
    id: TaskId,
    slot: Slot,
    target: Option<Target>,
    cancel: CancelFlag,
    state: watch::Sender<TaskState>,
}

impl TaskControl {
    /// Move to `next` unless already terminal. Returns whether the state changed.
    fn transition(&self, next: TaskState) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        })
    }
}

/// Caller-side view of one task
#[derive(Clone)]
pub struct TaskHandle {
    control: Arc<TaskControl>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.control.id)
            .field("slot", &self.control.slot)
            .field("state", &self.state())
            .finish()
    }
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.control.id
    }

    pub fn slot(&self) -> &Slot {
        &self.control.slot
    }

    pub fn state(&self) -> TaskState {
        *self.control.state.borrow()
    }

    /// Request cancellation. No-op once the task is terminal.
    pub fn cancel(&self) {
        if !self.state().is_terminal() {
            self.control.cancel.cancel();
        }
    }

    /// Wait up to `timeout` for a terminal state; `None` on timeout.
    pub async fn wait(&self, timeout: Duration) -> Option<TaskState> {
        let mut rx = self.control.state.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|state| state.is_terminal())).await;
        match waited {
            Ok(Ok(state)) => Some(*state),
            // Sender lives in `control`, which we hold
            Ok(Err(_)) => Some(self.state()),
            Err(_) => None,
        }
    }
}

struct Inner {
    loader: ManifestLoader,
    cache: Arc<LoadCache>,
    config: LoaderConfig,
    slots: Mutex<HashMap<Slot, Arc<TaskControl>>>,
    next_task: AtomicU64,
    events: mpsc::UnboundedSender<LoadEvent>,
}

impl Inner {
    /// Register a new task in `slot`, cancelling the previous occupant.
    ///
    /// If the occupant is already running the same target it is kept and
    /// returned instead; the flag is `true` only for a newly registered task.
    fn start_task(&self, slot: Slot, target: Option<Target>, initial: TaskState) -> (Arc<TaskControl>, bool) {
        let mut slots = self.slots.lock();
        if let Some(existing) = slots.get(&slot) {
            let running = *existing.state.borrow() == TaskState::Running;
            let same_target = target.is_some() && existing.target == target;
            if same_target && running && !existing.cancel.is_cancelled() {
                debug!(slot = %slot, task_id = existing.id, "Reusing running task for identical selection");
                return (Arc::clone(existing), false);
            }
        }

        let id = self.next_task.fetch_add(1, Ordering::Relaxed);
        let (state, _) = watch::channel(initial);
        let control = Arc::new(TaskControl {
            id,
            slot: slot.clone(),
            target,
            cancel: CancelFlag::new(),
            state,
        });

        if let Some(previous) = slots.insert(slot.clone(), Arc::clone(&control)) {
            debug!(slot = %slot, task_id = previous.id, superseded_by = id, "Cancelling superseded task");
            previous.cancel.cancel();
        }
        (control, true)
    }

    /// Send `kind` if `task` still owns its slot. Terminal events also settle
    /// the task state and release the slot, all under the same lock.
    fn emit(&self, task: &TaskControl, kind: LoadEventKind) -> bool {
        let mut slots = self.slots.lock();
        let current = slots.get(&task.slot).map(|c| c.id) == Some(task.id);
        if !current || task.cancel.is_cancelled() {
            debug!(task_id = task.id, slot = %task.slot, "Suppressed event from stale task");
            return false;
        }

        let terminal = kind.is_terminal();
        if terminal {
            let state = if matches!(kind, LoadEventKind::Failed(_)) {
                TaskState::Failed
            } else {
                TaskState::Completed
            };
            task.transition(state);
            slots.remove(&task.slot);
        }
        // A dropped receiver only means nobody is listening any more
        let _ = self.events.send(LoadEvent {
            task: task.id,
            slot: task.slot.clone(),
            kind,
        });
        true
    }

    fn finish(&self, task: &TaskControl, outcome: Result<LoadEventKind, ApiError>) {
        let emitted = match outcome {
            Ok(kind) => self.emit(task, kind),
            Err(ApiError::Cancelled) => false,
            Err(e) => {
                warn!(task_id = task.id, slot = %task.slot, error = %e, "Load failed");
                self.emit(task, LoadEventKind::Failed(e))
            }
        };
        if !emitted {
            task.transition(TaskState::Cancelled);
            let mut slots = self.slots.lock();
            if slots.get(&task.slot).map(|c| c.id) == Some(task.id) {
                slots.remove(&task.slot);
            }
        }
        let state = *task.state.borrow();
        debug!(task_id = task.id, slot = %task.slot, state = ?state, "Task finished");
    }

    fn progress_sink(self: &Arc<Self>, task: &Arc<TaskControl>) -> ProgressFn {
        let inner = Arc::downgrade(self);
        let task = Arc::downgrade(task);
        Arc::new(move |text| {
            if let (Some(inner), Some(task)) = (inner.upgrade(), task.upgrade()) {
                inner.emit(&task, LoadEventKind::Progress(text));
            }
        })
    }
}

/// Resolve with `work`, or with `Cancelled` as soon as `cancel` fires.
async fn or_cancelled<T>(
    cancel: &CancelFlag,
    work: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        result = work => result,
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
    }
}

/// Owns the background tasks that fill the [`LoadCache`].
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct LoadCoordinator {
    inner: Arc<Inner>,
}

impl LoadCoordinator {
    pub fn new(
        loader: ManifestLoader,
        cache: Arc<LoadCache>,
        config: LoaderConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Inner {
            loader,
            cache,
            config,
            slots: Mutex::new(HashMap::new()),
            next_task: AtomicU64::new(1),
            events,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }

    pub fn cache(&self) -> &Arc<LoadCache> {
        &self.inner.cache
    }

    pub fn loader(&self) -> &ManifestLoader {
        &self.inner.loader
    }

    /// Id of the task currently occupying `slot`
    pub fn current(&self, slot: &Slot) -> Option<TaskId> {
        self.inner.slots.lock().get(slot).map(|c| c.id)
    }

    /// Load the version catalog of `game` in the version-list slot.
    ///
    /// Selecting a game whose catalog is already loading in this slot returns
    /// the running task's handle.
    pub fn load_versions(&self, game: &str) -> Result<TaskHandle, ApiError> {
        self.inner.loader.game(game)?;
        let game = game.to_string();
        let debounce = Duration::from_millis(self.inner.config.debounce_ms);
        let target = Target::Catalog(game.clone());

        Ok(self.spawn(Slot::VersionList, Some(target), debounce, move |inner, task| async move {
            let catalog = fetch_catalog(&inner, &task.cancel, &game).await?;
            Ok::<_, ApiError>(LoadEventKind::VersionsLoaded { game, catalog })
        }))
    }

    /// Load the file tree for one (game, version, voices) selection in the file-list slot.
    ///
    /// Re-selecting the key that is already loading returns the running task's
    /// handle, so its fetch and build are not repeated.
    pub fn load_files<I, S>(&self, game: &str, version: &str, voices: I) -> Result<TaskHandle, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.loader.game(game)?;
        let key = CacheKey::new(game, version, voices);
        let debounce = Duration::from_millis(self.inner.config.debounce_ms);
        let target = Target::Tree(key.clone());

        Ok(self.spawn(Slot::FileList, Some(target), debounce, move |inner, task| async move {
            let progress = inner.progress_sink(&task);
            let loader = inner.loader.clone();
            let build_key = key.clone();
            let build_cancel = task.cancel.clone();
            let build = inner.cache.get_or_build(key.clone(), move || async move {
                loader.load_tree(&build_key, &build_cancel, &progress).await
            });
            let result = or_cancelled(&task.cancel, build).await?;

            for failure in &result.voice_pack_failures {
                inner.emit(&task, LoadEventKind::Warning(failure.to_string()));
            }
            Ok::<_, ApiError>(LoadEventKind::FilesLoaded { key, result })
        }))
    }

    /// Warm the catalog cache for every game in `games` concurrently.
    ///
    /// Games already cached are skipped; a failing game does not stop the
    /// others. Not debounced.
    pub fn preload_all<I, S>(&self, games: I) -> TaskHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let games: Vec<GameId> = games.into_iter().map(Into::into).collect();

        self.spawn(Slot::Preload, None, Duration::ZERO, move |inner, task| async move {
            let pending: Vec<GameId> = games
                .into_iter()
                .filter(|game| !inner.cache.catalogs().contains(game))
                .collect();
            let total = pending.len();
            if total == 0 {
                return Ok(LoadEventKind::PreloadFinished {
                    all_succeeded: true,
                    failed_games: Vec::new(),
                });
            }
            info!(task_id = task.id, total, "Preloading version catalogs");
            inner.emit(&task, LoadEventKind::Progress(format!("Preloading {} games...", total)));

            let mut set = JoinSet::new();
            for game in pending {
                let inner = Arc::clone(&inner);
                let cancel = task.cancel.clone();
                set.spawn(async move {
                    let result = fetch_catalog(&inner, &cancel, &game).await;
                    (game, result)
                });
            }

            let mut completed = 0;
            let mut failed_games = Vec::new();
            while let Some(joined) = or_cancelled(&task.cancel, async {
                Ok::<_, ApiError>(set.join_next().await)
            })
            .await?
            {
                let (game, result) = joined.map_err(|e| ApiError::Task(e.to_string()))?;
                completed += 1;
                let error = match result {
                    Ok(_) => None,
                    Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                    Err(e) => {
                        warn!(game = %game, error = %e, "Preload failed");
                        failed_games.push(game.clone());
                        Some(e)
                    }
                };
                inner.emit(
                    &task,
                    LoadEventKind::PreloadProgress {
                        game,
                        error,
                        completed,
                        total,
                    },
                );
            }

            failed_games.sort();
            Ok(LoadEventKind::PreloadFinished {
                all_succeeded: failed_games.is_empty(),
                failed_games,
            })
        })
    }

    /// Cancel the task in `slot`, if any. Returns whether one was active.
    pub fn cancel(&self, slot: &Slot) -> bool {
        let active = self.inner.slots.lock().get(slot).cloned();
        match active {
            Some(control) => {
                control.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every active task and wait up to `timeout` for them to settle.
    /// Returns `false` if some task was still running when the time ran out.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let active: Vec<TaskHandle> = self
            .inner
            .slots
            .lock()
            .values()
            .map(|control| TaskHandle {
                control: Arc::clone(control),
            })
            .collect();
        info!(active = active.len(), "Shutting down load coordinator");

        for handle in &active {
            handle.cancel();
        }
        let deadline = tokio::time::Instant::now() + timeout;
        let mut settled = true;
        for handle in &active {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            if handle.wait(left).await.is_none() {
                warn!(task_id = handle.id(), slot = %handle.slot(), "Task did not stop before shutdown timeout");
                settled = false;
            }
        }
        settled
    }

    fn spawn<F, Fut>(&self, slot: Slot, target: Option<Target>, debounce: Duration, work: F) -> TaskHandle
    where
        F: FnOnce(Arc<Inner>, Arc<TaskControl>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<LoadEventKind, ApiError>> + Send + 'static,
    {
        let initial = if debounce.is_zero() {
            TaskState::Running
        } else {
            TaskState::Pending
        };
        let (control, fresh) = self.inner.start_task(slot, target, initial);
        if !fresh {
            return TaskHandle { control };
        }
        let inner = Arc::clone(&self.inner);
        let task = Arc::clone(&control);
        debug!(task_id = task.id, slot = %task.slot, debounce_ms = debounce.as_millis() as u64, "Task started");

        tokio::spawn(async move {
            if !debounce.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => {}
                    _ = task.cancel.cancelled() => {}
                }
            }
            if task.cancel.is_cancelled() {
                inner.finish(&task, Err(ApiError::Cancelled));
                return;
            }
            task.transition(TaskState::Running);

            let outcome = work(Arc::clone(&inner), Arc::clone(&task)).await;
            inner.finish(&task, outcome);
        });

        TaskHandle { control }
    }
}

async fn fetch_catalog(
    inner: &Arc<Inner>,
    cancel: &CancelFlag,
    game: &str,
) -> Result<Arc<VersionCatalog>, ApiError> {
    let loader = inner.loader.clone();
    let fetch_cancel = cancel.clone();
    let fetch_game = game.to_string();
    let fetch = inner.cache.get_or_fetch_catalog(game, move || async move {
        loader.load_catalog(&fetch_game, &fetch_cancel).await
    });
    or_cancelled(cancel, fetch).await
}
