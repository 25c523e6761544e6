//! Manifest endpoints over HTTP.

use super::VersionCatalog;
use crate::config::ApiConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Raw access to the upstream manifest service.
///
/// Implementations do no caching; that lives in [`crate::cache::LoadCache`].
#[async_trait]
pub trait ManifestClient: Send + Sync {
    /// Fetch and decode `{game}_versions.json`.
    async fn fetch_version_catalog(&self, game: &str) -> Result<VersionCatalog, ApiError>;

    /// Fetch one newline-delimited manifest file as text.
    async fn fetch_manifest_payload(
        &self,
        game: &str,
        version: &str,
        file_name: &str,
    ) -> Result<String, ApiError>;
}

/// reqwest-backed client with an optional sticky fallback base URL
pub struct HttpManifestClient {
    client: reqwest::Client,
    active_base: RwLock<String>,
    fallback_base: Option<String>,
    list_timeout: Duration,
    manifest_timeout: Duration,
}

impl HttpManifestClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.list_timeout_secs))
            .user_agent(concat!("hoyofiles/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let fallback_base = config
            .fallback_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            client,
            active_base: RwLock::new(config.base_url.trim_end_matches('/').to_string()),
            fallback_base,
            list_timeout: Duration::from_secs(config.list_timeout_secs),
            manifest_timeout: Duration::from_secs(config.manifest_timeout_secs),
        })
    }

    /// Base URL currently in use; switches to the fallback after a failed catalog fetch.
    pub fn active_base(&self) -> String {
        self.active_base.read().clone()
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ApiError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Transport(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }

    async fn fetch_catalog_from(&self, base: &str, game: &str) -> Result<VersionCatalog, ApiError> {
        let url = Self::url(base, &format!("{}_versions.json", game));
        let body = self.get_bytes(&url, self.list_timeout).await?;
        let catalog: VersionCatalog = serde_json::from_slice(&body)?;
        Ok(catalog)
    }

    /// Base to retry a failed catalog fetch against.
    ///
    /// The first failure against the primary switches the active base to the
    /// fallback; later failures against the primary retry there as well, even
    /// if another caller already switched. `None` when no fallback is configured
    /// or the failure came from the fallback itself.
    fn retry_base(&self, failed_base: &str) -> Option<String> {
        let fallback = self.fallback_base.as_ref()?;
        if failed_base == fallback.as_str() {
            return None;
        }
        let mut active = self.active_base.write();
        if active.as_str() != fallback.as_str() {
            info!(fallback = %fallback, "Switching to fallback base URL");
            *active = fallback.clone();
        }
        Some(fallback.clone())
    }
}

#[async_trait]
impl ManifestClient for HttpManifestClient {
    async fn fetch_version_catalog(&self, game: &str) -> Result<VersionCatalog, ApiError> {
        let start = Instant::now();
        let base = self.active_base();
        let result = match self.fetch_catalog_from(&base, game).await {
            Ok(catalog) => Ok(catalog),
            Err(err) => match self.retry_base(&base) {
                Some(fallback) => {
                    warn!(
                        game = %game,
                        error = %err,
                        fallback = %fallback,
                        "Version catalog fetch failed, retrying against fallback"
                    );
                    self.fetch_catalog_from(&fallback, game).await
                }
                None => Err(err),
            },
        };

        if let Ok(catalog) = &result {
            debug!(
                game = %game,
                versions = catalog.len(),
                duration_ms = start.elapsed().as_millis(),
                "Fetched version catalog"
            );
        }
        result
    }

    async fn fetch_manifest_payload(
        &self,
        game: &str,
        version: &str,
        file_name: &str,
    ) -> Result<String, ApiError> {
        let base = self.active_base();
        let url = Self::url(&base, &format!("{}/{}/{}", game, version, file_name));
        let body = self.get_bytes(&url, self.manifest_timeout).await?;
        let text = String::from_utf8(body)
            .map_err(|e| ApiError::Decode(format!("{} is not UTF-8: {}", url, e)))?;
        debug!(url = %url, bytes = text.len(), "Fetched manifest payload");
        Ok(text)
    }
}
