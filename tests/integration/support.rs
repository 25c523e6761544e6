//! Shared fixtures: a scripted in-memory manifest client and a minimal HTTP responder.

use async_trait::async_trait;
use hoyofiles::config::{ExplorerConfig, LoaderConfig};
use hoyofiles::error::ApiError;
use hoyofiles::manifest::{ManifestClient, VersionCatalog, VersionDescriptor};
use hoyofiles::{LoadEvent, LoadEventKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};

/// Config with a short debounce so tests stay fast
pub fn test_config(debounce_ms: u64) -> ExplorerConfig {
    ExplorerConfig {
        loader: LoaderConfig {
            debounce_ms,
            ..LoaderConfig::default()
        },
        ..ExplorerConfig::default()
    }
}

pub fn catalog(labels: &[&str]) -> VersionCatalog {
    VersionCatalog::from_entries(
        labels
            .iter()
            .map(|label| (label.to_string(), VersionDescriptor::default()))
            .collect(),
    )
}

/// ndjson manifest body from (path, size) pairs
pub fn manifest(files: &[(&str, u64)]) -> String {
    files
        .iter()
        .map(|(path, size)| {
            format!(
                "{{\"remoteName\":\"{}\",\"md5\":\"md5-{}\",\"fileSize\":{}}}\n",
                path, size, size
            )
        })
        .collect()
}

/// In-memory [`ManifestClient`] with call counters and an optional gate.
///
/// When gated, every fetch waits for a permit; tests release fetches with
/// [`ScriptedClient::release`].
#[derive(Default)]
pub struct ScriptedClient {
    catalogs: Mutex<HashMap<String, Result<VersionCatalog, ApiError>>>,
    payloads: Mutex<HashMap<String, Result<String, ApiError>>>,
    gate: Option<Arc<Semaphore>>,
    catalog_calls: AtomicUsize,
    manifest_calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn with_catalog(self, game: &str, labels: &[&str]) -> Self {
        self.catalogs
            .lock()
            .insert(game.to_string(), Ok(catalog(labels)));
        self
    }

    pub fn with_catalog_error(self, game: &str, error: ApiError) -> Self {
        self.catalogs.lock().insert(game.to_string(), Err(error));
        self
    }

    pub fn with_manifest(self, game: &str, version: &str, file: &str, files: &[(&str, u64)]) -> Self {
        self.payloads
            .lock()
            .insert(format!("{}/{}/{}", game, version, file), Ok(manifest(files)));
        self
    }

    pub fn with_raw_manifest(self, game: &str, version: &str, file: &str, body: &str) -> Self {
        self.payloads
            .lock()
            .insert(format!("{}/{}/{}", game, version, file), Ok(body.to_string()));
        self
    }

    /// Let `n` gated fetches through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Paths of manifest fetches, in call order
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn manifest_calls(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl ManifestClient for ScriptedClient {
    async fn fetch_version_catalog(&self, game: &str) -> Result<VersionCatalog, ApiError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.catalogs
            .lock()
            .get(game)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Transport(format!("HTTP 404 for {}_versions.json", game))))
    }

    async fn fetch_manifest_payload(
        &self,
        game: &str,
        version: &str,
        file_name: &str,
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/{}", game, version, file_name);
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(path.clone());
        self.pass_gate().await;
        self.payloads
            .lock()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Transport(format!("HTTP 404 for {}", path))))
    }
}

/// Wait for the terminal event of `task`, collecting everything it emitted.
pub async fn events_until_terminal(
    rx: &mut mpsc::UnboundedReceiver<LoadEvent>,
    task: u64,
) -> Vec<LoadEventKind> {
    let collect = async {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if event.task != task {
                continue;
            }
            let terminal = matches!(
                event.kind,
                LoadEventKind::VersionsLoaded { .. }
                    | LoadEventKind::FilesLoaded { .. }
                    | LoadEventKind::Failed(_)
                    | LoadEventKind::PreloadFinished { .. }
            );
            seen.push(event.kind);
            if terminal {
                break;
            }
        }
        seen
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("task did not finish in time")
}

/// Everything currently queued on the channel
pub fn drain(rx: &mut mpsc::UnboundedReceiver<LoadEvent>) -> Vec<LoadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `condition` until it holds or a second passes.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Minimal HTTP/1.1 responder for exercising the reqwest client.
pub struct TestServer {
    pub base: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Serve `routes` (path -> (status, body)); unknown paths get 404.
    pub async fn start(routes: Vec<(&str, u16, &str)>) -> Self {
        Self::start_with_delay(routes, Duration::ZERO).await
    }

    /// Like [`TestServer::start`], but every response waits `delay` first.
    pub async fn start_with_delay(routes: Vec<(&str, u16, &str)>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, status, body)| (path.to_string(), (status, body.to_string())))
                .collect(),
        );
        let hits = Arc::new(Mutex::new(Vec::new()));

        let server_hits = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let hits = Arc::clone(&server_hits);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&request);
                    let path = head
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();
                    hits.lock().push(path.clone());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }

                    let (status, body) = routes
                        .get(&path)
                        .cloned()
                        .unwrap_or((404, "not found".to_string()));
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { base, hits }
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().clone()
    }
}
