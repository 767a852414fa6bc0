//! One version of the shell worker: install, activate, and fetch handling

use super::cache::CacheStorage;
use super::manifest::ShellManifest;
use super::request::{Fetcher, ShellRequest, ShellResponse};
use crate::error::{CacheError, FetchError};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Lifecycle of a worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Waiting,
    Active,
    /// Replaced by a newer version
    Superseded,
    /// Failed to install, or unregistered
    Redundant,
}

/// What an install attempt managed to cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub bucket: String,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

/// Where a response handed back to the page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthetic reply after the network failed
    Offline,
}

/// Result of offering a request to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller sends it to the origin itself
    Passthrough,
    Respond {
        response: ShellResponse,
        source: ResponseSource,
    },
}

/// Shell worker for a single manifest version
pub struct ShellWorker {
    manifest: ShellManifest,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
}

impl ShellWorker {
    pub fn new(
        manifest: ShellManifest,
        caches: Arc<dyn CacheStorage>,
        network: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            manifest,
            caches,
            network,
        }
    }

    pub fn manifest(&self) -> &ShellManifest {
        &self.manifest
    }

    pub fn cache_name(&self) -> String {
        self.manifest.cache_name()
    }

    /// Pre-populate this version's bucket with every manifest asset
    ///
    /// Assets are fetched independently; one failing does not stop the rest.
    /// Only failing to open the bucket itself is an error.
    pub async fn install(&self) -> Result<InstallReport, CacheError> {
        let bucket = self.cache_name();
        tracing::info!("Installing shell {}", bucket);
        self.caches.open(&bucket).await?;

        let attempts = self.manifest.assets.iter().map(|url| {
            let bucket = bucket.as_str();
            async move { (url.clone(), self.cache_asset(bucket, url).await) }
        });

        let mut report = InstallReport {
            bucket: bucket.clone(),
            ..InstallReport::default()
        };
        for (url, result) in join_all(attempts).await {
            match result {
                Ok(()) => report.cached.push(url),
                Err(e) => {
                    tracing::warn!("Failed to cache asset {}: {}", url, e);
                    report.failed.push(url);
                }
            }
        }

        tracing::info!(
            "Installed shell {}: {} cached, {} failed",
            bucket,
            report.cached.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn cache_asset(&self, bucket: &str, url: &str) -> Result<(), AssetError> {
        let response = self.network.fetch(&ShellRequest::get(url)).await?;
        if !response.status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status.as_u16(),
            }
            .into());
        }
        self.caches.put(bucket, url, &response).await?;
        Ok(())
    }

    /// Delete every bucket that does not belong to this version
    ///
    /// Returns the names of the removed buckets.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let current = self.cache_name();
        tracing::info!("Activating shell {}", current);

        let mut removed = Vec::new();
        for bucket in self.caches.keys().await? {
            if bucket != current && self.caches.delete(&bucket).await? {
                tracing::info!("Deleted stale shell cache {}", bucket);
                removed.push(bucket);
            }
        }
        Ok(removed)
    }

    /// Answer an intercepted request: cache, then network, then a synthetic 503
    pub async fn handle_fetch(&self, request: &ShellRequest) -> FetchOutcome {
        if !request.is_intercepted() {
            return FetchOutcome::Passthrough;
        }

        match self.caches.lookup(&request.url).await {
            Ok(Some(response)) => {
                tracing::debug!("Cache hit: {}", request.url);
                return FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Cache,
                };
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache lookup failed for {}: {}", request.url, e),
        }

        tracing::debug!("Fetch: {}", request.url);
        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome::Respond {
                response,
                source: ResponseSource::Network,
            },
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", request.url, e);
                FetchOutcome::Respond {
                    response: ShellResponse::offline(),
                    source: ResponseSource::Offline,
                }
            }
        }
    }
}

/// Either half of caching one asset failing
#[derive(Debug, thiserror::Error)]
enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shell::cache::MemoryCacheStorage;
    use async_trait::async_trait;
    use http::Method;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Network double serving a fixed set of URLs
    #[derive(Default)]
    pub(crate) struct ScriptedNetwork {
        pub responses: HashMap<String, ShellResponse>,
        pub calls: AtomicUsize,
    }

    impl ScriptedNetwork {
        pub fn serving(urls: &[&str]) -> Self {
            Self {
                responses: urls
                    .iter()
                    .map(|url| (url.to_string(), ShellResponse::ok("text/plain", *url)))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedNetwork {
        async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(&request.url)
                .cloned()
                .ok_or_else(|| FetchError::Network(format!("unreachable: {}", request.url)))
        }
    }

    fn manifest_v3() -> ShellManifest {
        ShellManifest::new(
            "shell",
            3,
            vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/styles.css".to_string(),
                "/app.js".to_string(),
                "https://cdn.example.com/jszip.min.js".to_string(),
                "https://cdn.example.com/epub.min.js".to_string(),
            ],
        )
    }

    #[tokio::test]
    async fn test_install_tolerates_one_failed_asset() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(ScriptedNetwork::serving(&[
            "/",
            "/index.html",
            "/styles.css",
            "/app.js",
            "https://cdn.example.com/jszip.min.js",
        ]));
        let worker = ShellWorker::new(manifest_v3(), caches.clone(), network);

        let report = worker.install().await.unwrap();
        assert_eq!(report.bucket, "shell-v3");
        assert_eq!(report.cached.len(), 5);
        assert_eq!(report.failed, vec!["https://cdn.example.com/epub.min.js"]);
        assert_eq!(caches.entries("shell-v3").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_install_skips_error_statuses() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let mut network = ScriptedNetwork::serving(&["/", "/index.html"]);
        network.responses.insert(
            "/app.js".to_string(),
            ShellResponse::new(http::StatusCode::NOT_FOUND, None, Vec::new()),
        );
        let manifest = ShellManifest::new(
            "shell",
            1,
            vec!["/".into(), "/index.html".into(), "/app.js".into()],
        );
        let worker = ShellWorker::new(manifest, caches.clone(), Arc::new(network));

        let report = worker.install().await.unwrap();
        assert_eq!(report.failed, vec!["/app.js"]);
        assert!(!caches.entries("shell-v1").await.unwrap().contains(&"/app.js".to_string()));
    }

    #[tokio::test]
    async fn test_activate_removes_other_versions() {
        let caches = Arc::new(MemoryCacheStorage::new());
        for bucket in ["shell-v1", "shell-v2", "unrelated"] {
            caches.open(bucket).await.unwrap();
        }
        let worker = ShellWorker::new(
            manifest_v3(),
            caches.clone(),
            Arc::new(ScriptedNetwork::serving(&["/"])),
        );
        worker.install().await.unwrap();

        let mut removed = worker.activate().await.unwrap();
        removed.sort();
        assert_eq!(removed, vec!["shell-v1", "shell-v2", "unrelated"]);
        assert_eq!(caches.keys().await.unwrap(), vec!["shell-v3"]);
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_network_call() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(ScriptedNetwork::serving(&["/index.html"]));
        let worker = ShellWorker::new(manifest_v3(), caches.clone(), network.clone());
        caches
            .put("shell-v3", "/index.html", &ShellResponse::ok("text/html", "<html>"))
            .await
            .unwrap();

        let outcome = worker.handle_fetch(&ShellRequest::get("/index.html")).await;
        assert_eq!(
            outcome,
            FetchOutcome::Respond {
                response: ShellResponse::ok("text/html", "<html>"),
                source: ResponseSource::Cache,
            }
        );
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_goes_to_network_without_write_back() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(ScriptedNetwork::serving(&["/chapter.css"]));
        let worker = ShellWorker::new(manifest_v3(), caches.clone(), network.clone());

        let outcome = worker.handle_fetch(&ShellRequest::get("/chapter.css")).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Respond {
                source: ResponseSource::Network,
                ..
            }
        ));
        assert_eq!(network.calls(), 1);
        assert!(caches.lookup("/chapter.css").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_every_intercepted_get_gets_a_response() {
        let worker = ShellWorker::new(
            manifest_v3(),
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(ScriptedNetwork::default()),
        );

        for url in ["/", "/missing.png", "https://cdn.example.com/x.js"] {
            match worker.handle_fetch(&ShellRequest::get(url)).await {
                FetchOutcome::Respond { response, source } => {
                    assert_eq!(source, ResponseSource::Offline);
                    assert_eq!(response.status, http::StatusCode::SERVICE_UNAVAILABLE);
                }
                FetchOutcome::Passthrough => panic!("GET {url} was not answered"),
            }
        }
    }

    #[tokio::test]
    async fn test_excluded_requests_pass_through() {
        let network = Arc::new(ScriptedNetwork::default());
        let worker = ShellWorker::new(
            manifest_v3(),
            Arc::new(MemoryCacheStorage::new()),
            network.clone(),
        );

        for request in [
            ShellRequest::new(Method::POST, "/api/v1/library"),
            ShellRequest::get("blob:http://localhost:3000/abcd"),
            ShellRequest::get("data:image/png;base64,AAAA"),
        ] {
            assert_eq!(worker.handle_fetch(&request).await, FetchOutcome::Passthrough);
        }
        assert_eq!(network.calls(), 0);
    }
}
