//! Background task hosting the shell worker
//!
//! The runtime owns the registration and talks to callers only through
//! messages. Installation runs in its own task and reports back; activation
//! is processed only once that report arrives. Fetches are handed to the
//! active worker in separate tasks so they never queue behind an install.

use super::cache::CacheStorage;
use super::manifest::ShellManifest;
use super::request::{Fetcher, ShellRequest};
use super::worker::{FetchOutcome, InstallReport, ShellWorker, WorkerState};
use crate::error::CacheError;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const MAILBOX_SIZE: usize = 64;

/// Result of a completed install followed by activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub version: u32,
    pub install: InstallReport,
    pub removed_buckets: Vec<String>,
}

/// Reply to a registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    Activated(ActivationReport),
    /// This version is already the active one
    Unchanged { version: u32 },
    /// The new version never became active; any previous one keeps serving
    Failed { version: u32, error: String },
}

/// Snapshot of the runtime for status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellStatus {
    /// State of the most recently registered version
    pub state: Option<WorkerState>,
    pub version: Option<u32>,
    /// Version currently answering fetches
    pub active_version: Option<u32>,
    pub buckets: Vec<String>,
}

enum ShellMessage {
    Register {
        manifest: ShellManifest,
        reply: oneshot::Sender<RegisterOutcome>,
    },
    Installed {
        generation: u64,
        cache_name: String,
        result: Result<InstallReport, CacheError>,
    },
    Fetch {
        request: ShellRequest,
        reply: oneshot::Sender<FetchOutcome>,
    },
    Refresh {
        reply: oneshot::Sender<Result<Vec<String>, CacheError>>,
    },
    Status {
        reply: oneshot::Sender<ShellStatus>,
    },
}

/// Cloneable handle to the shell runtime task
#[derive(Clone)]
pub struct ShellHandle {
    tx: mpsc::Sender<ShellMessage>,
}

impl ShellHandle {
    /// Start the runtime on the current tokio runtime
    ///
    /// The task stops once every handle is dropped.
    pub fn spawn(caches: Arc<dyn CacheStorage>, network: Arc<dyn Fetcher>) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_SIZE);
        let runtime = ShellRuntime {
            caches,
            network,
            active: None,
            pending: None,
            generation: 0,
            state: None,
            version: None,
            mailbox: tx.downgrade(),
        };
        tokio::spawn(runtime.run(rx));
        Self { tx }
    }

    /// Install `manifest` and, once installed, make it the active version
    ///
    /// Resolves after activation has finished, or when the registration
    /// failed or was replaced by a newer one.
    pub async fn register(&self, manifest: ShellManifest) -> Result<RegisterOutcome, CacheError> {
        let (reply, rx) = oneshot::channel();
        self.send(ShellMessage::Register { manifest, reply }).await?;
        rx.await.map_err(|_| CacheError::WorkerGone)
    }

    /// Offer a request to the active worker
    ///
    /// With no active worker, or if the runtime has stopped, the request
    /// passes through.
    pub async fn fetch(&self, request: ShellRequest) -> FetchOutcome {
        let (reply, rx) = oneshot::channel();
        if self
            .send(ShellMessage::Fetch { request, reply })
            .await
            .is_err()
        {
            return FetchOutcome::Passthrough;
        }
        rx.await.unwrap_or(FetchOutcome::Passthrough)
    }

    /// Unregister the worker and delete every bucket regardless of version
    ///
    /// Returns the deleted bucket names. The caller re-registers afterwards.
    pub async fn refresh(&self) -> Result<Vec<String>, CacheError> {
        let (reply, rx) = oneshot::channel();
        self.send(ShellMessage::Refresh { reply }).await?;
        rx.await.map_err(|_| CacheError::WorkerGone)?
    }

    pub async fn status(&self) -> Result<ShellStatus, CacheError> {
        let (reply, rx) = oneshot::channel();
        self.send(ShellMessage::Status { reply }).await?;
        rx.await.map_err(|_| CacheError::WorkerGone)
    }

    async fn send(&self, message: ShellMessage) -> Result<(), CacheError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| CacheError::WorkerGone)
    }
}

struct PendingInstall {
    generation: u64,
    worker: Arc<ShellWorker>,
    reply: oneshot::Sender<RegisterOutcome>,
    task: JoinHandle<()>,
}

struct ShellRuntime {
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
    active: Option<Arc<ShellWorker>>,
    pending: Option<PendingInstall>,
    generation: u64,
    state: Option<WorkerState>,
    version: Option<u32>,
    mailbox: mpsc::WeakSender<ShellMessage>,
}

impl ShellRuntime {
    async fn run(mut self, mut rx: mpsc::Receiver<ShellMessage>) {
        tracing::debug!("Shell runtime started");
        while let Some(message) = rx.recv().await {
            match message {
                ShellMessage::Register { manifest, reply } => {
                    self.register(manifest, reply).await
                }
                ShellMessage::Installed {
                    generation,
                    cache_name,
                    result,
                } => self.installed(generation, cache_name, result).await,
                ShellMessage::Fetch { request, reply } => self.fetch(request, reply),
                ShellMessage::Refresh { reply } => {
                    let _ = reply.send(self.refresh().await);
                }
                ShellMessage::Status { reply } => {
                    let _ = reply.send(self.status().await);
                }
            }
        }
        tracing::debug!("Shell runtime stopped");
    }

    async fn register(
        &mut self,
        manifest: ShellManifest,
        reply: oneshot::Sender<RegisterOutcome>,
    ) {
        let version = manifest.version;
        let active_version = self.active.as_ref().map(|w| w.manifest().version);
        if self.pending.is_none() && active_version == Some(version) {
            tracing::debug!("Shell v{} already active", version);
            let _ = reply.send(RegisterOutcome::Unchanged { version });
            return;
        }

        if let Some(abandoned) = self.cancel_pending("superseded by a newer registration").await {
            tracing::info!("Install of {} superseded by v{}", abandoned, version);
            if abandoned != manifest.cache_name() {
                self.discard_bucket(&abandoned).await;
            }
        }

        self.generation += 1;
        self.state = Some(WorkerState::Installing);
        self.version = Some(version);

        let worker = Arc::new(ShellWorker::new(
            manifest,
            self.caches.clone(),
            self.network.clone(),
        ));
        let generation = self.generation;
        let mailbox = self.mailbox.clone();
        let installing = worker.clone();
        let task = tokio::spawn(async move {
            let result = installing.install().await;
            if let Some(tx) = mailbox.upgrade() {
                let cache_name = installing.cache_name();
                let _ = tx
                    .send(ShellMessage::Installed {
                        generation,
                        cache_name,
                        result,
                    })
                    .await;
            }
        });
        self.pending = Some(PendingInstall {
            generation,
            worker,
            reply,
            task,
        });
    }

    /// Stop the pending install, fail its registration and return its bucket name
    async fn cancel_pending(&mut self, reason: &str) -> Option<String> {
        let pending = self.pending.take()?;
        pending.task.abort();
        // Wait until the install can no longer write to its bucket
        let _ = pending.task.await;
        let _ = pending.reply.send(RegisterOutcome::Failed {
            version: pending.worker.manifest().version,
            error: reason.to_string(),
        });
        Some(pending.worker.cache_name())
    }

    /// Delete a bucket left by an abandoned install, unless a live worker owns it
    async fn discard_bucket(&self, bucket: &str) {
        let in_use = self
            .active
            .iter()
            .map(|w| w.cache_name())
            .chain(self.pending.iter().map(|p| p.worker.cache_name()))
            .any(|name| name == bucket);
        if in_use {
            return;
        }
        match self.caches.delete(bucket).await {
            Ok(true) => tracing::debug!("Removed abandoned shell cache {}", bucket),
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to remove abandoned shell cache {}: {}", bucket, e),
        }
    }

    async fn installed(
        &mut self,
        generation: u64,
        cache_name: String,
        result: Result<InstallReport, CacheError>,
    ) {
        if self.pending.as_ref().map(|p| p.generation) != Some(generation) {
            tracing::debug!("Discarding stale install report (generation {})", generation);
            self.discard_bucket(&cache_name).await;
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };
        let version = pending.worker.manifest().version;

        let install = match result {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Shell v{} failed to install: {}", version, e);
                self.state = Some(WorkerState::Redundant);
                let _ = pending.reply.send(RegisterOutcome::Failed {
                    version,
                    error: e.to_string(),
                });
                return;
            }
        };

        // Installed workers skip waiting and take over at once
        self.state = Some(WorkerState::Waiting);
        if let Some(previous) = self.active.replace(pending.worker.clone()) {
            tracing::info!(
                "Shell v{} is now {:?}",
                previous.manifest().version,
                WorkerState::Superseded
            );
        }

        let removed_buckets = match pending.worker.activate().await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("Failed to clean up stale shell caches: {}", e);
                Vec::new()
            }
        };
        self.state = Some(WorkerState::Active);
        tracing::info!("Shell v{} active", version);

        let _ = pending.reply.send(RegisterOutcome::Activated(ActivationReport {
            version,
            install,
            removed_buckets,
        }));
    }

    fn fetch(&self, request: ShellRequest, reply: oneshot::Sender<FetchOutcome>) {
        let Some(worker) = self.active.clone() else {
            let _ = reply.send(FetchOutcome::Passthrough);
            return;
        };
        tokio::spawn(async move {
            let outcome = worker.handle_fetch(&request).await;
            let _ = reply.send(outcome);
        });
    }

    async fn refresh(&mut self) -> Result<Vec<String>, CacheError> {
        tracing::info!("Unregistering shell worker and clearing all caches");
        self.active = None;
        self.generation += 1;
        self.cancel_pending("unregistered").await;
        self.state = Some(WorkerState::Redundant);

        let mut deleted = Vec::new();
        for bucket in self.caches.keys().await? {
            if self.caches.delete(&bucket).await? {
                deleted.push(bucket);
            }
        }
        Ok(deleted)
    }

    async fn status(&self) -> ShellStatus {
        let buckets = match self.caches.keys().await {
            Ok(buckets) => buckets,
            Err(e) => {
                tracing::warn!("Failed to list shell caches: {}", e);
                Vec::new()
            }
        };
        ShellStatus {
            state: self.state,
            version: self.version,
            active_version: self.active.as_ref().map(|w| w.manifest().version),
            buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::shell::cache::MemoryCacheStorage;
    use crate::shell::request::ShellResponse;
    use crate::shell::worker::tests::ScriptedNetwork;
    use crate::shell::worker::ResponseSource;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds back one URL until the gate is opened
    struct GatedNetwork {
        inner: ScriptedNetwork,
        gated_url: &'static str,
        gate: Notify,
    }

    #[async_trait]
    impl Fetcher for GatedNetwork {
        async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, FetchError> {
            if request.url == self.gated_url {
                self.gate.notified().await;
            }
            self.inner.fetch(request).await
        }
    }

    fn manifest(version: u32, assets: &[&str]) -> ShellManifest {
        ShellManifest::new(
            "shell",
            version,
            assets.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn assets_v3() -> Vec<&'static str> {
        vec![
            "/",
            "/index.html",
            "/styles.css",
            "/app.js",
            "https://cdn.example.com/jszip.min.js",
            "https://cdn.example.com/epub.min.js",
        ]
    }

    #[tokio::test]
    async fn test_register_installs_and_activates() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let assets = assets_v3();
        let network = Arc::new(ScriptedNetwork::serving(&assets[..5]));
        let shell = ShellHandle::spawn(caches.clone(), network);

        let outcome = shell.register(manifest(3, &assets)).await.unwrap();
        let RegisterOutcome::Activated(report) = outcome else {
            panic!("expected activation, got {outcome:?}");
        };
        assert_eq!(report.version, 3);
        assert_eq!(report.install.cached.len(), 5);
        assert_eq!(report.install.failed.len(), 1);

        let status = shell.status().await.unwrap();
        assert_eq!(status.state, Some(WorkerState::Active));
        assert_eq!(status.active_version, Some(3));
        assert_eq!(status.buckets, vec!["shell-v3"]);
        assert_eq!(caches.entries("shell-v3").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_registering_active_version_is_unchanged() {
        let shell = ShellHandle::spawn(
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(ScriptedNetwork::serving(&["/"])),
        );
        shell.register(manifest(1, &["/"])).await.unwrap();
        assert_eq!(
            shell.register(manifest(1, &["/"])).await.unwrap(),
            RegisterOutcome::Unchanged { version: 1 }
        );
    }

    #[tokio::test]
    async fn test_upgrade_removes_previous_bucket() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let shell = ShellHandle::spawn(
            caches.clone(),
            Arc::new(ScriptedNetwork::serving(&["/", "/app.js"])),
        );
        shell.register(manifest(1, &["/"])).await.unwrap();

        let outcome = shell.register(manifest(2, &["/", "/app.js"])).await.unwrap();
        let RegisterOutcome::Activated(report) = outcome else {
            panic!("expected activation, got {outcome:?}");
        };
        assert_eq!(report.removed_buckets, vec!["shell-v1"]);
        assert_eq!(caches.keys().await.unwrap(), vec!["shell-v2"]);
    }

    #[tokio::test]
    async fn test_fetch_without_worker_passes_through() {
        let shell = ShellHandle::spawn(
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(ScriptedNetwork::serving(&["/"])),
        );
        assert_eq!(
            shell.fetch(ShellRequest::get("/")).await,
            FetchOutcome::Passthrough
        );
    }

    #[tokio::test]
    async fn test_fetch_is_answered_during_install() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(GatedNetwork {
            inner: ScriptedNetwork::serving(&["/index.html", "/app.js"]),
            gated_url: "/app.js",
            gate: Notify::new(),
        });
        let shell = ShellHandle::spawn(caches.clone(), network.clone());
        shell.register(manifest(1, &["/index.html"])).await.unwrap();

        let upgrade = {
            let shell = shell.clone();
            tokio::spawn(async move {
                shell
                    .register(manifest(2, &["/index.html", "/app.js"]))
                    .await
            })
        };
        for _ in 0..100 {
            if shell.status().await.unwrap().state == Some(WorkerState::Installing) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            shell.status().await.unwrap().state,
            Some(WorkerState::Installing)
        );

        match shell.fetch(ShellRequest::get("/index.html")).await {
            FetchOutcome::Respond { source, .. } => assert_eq!(source, ResponseSource::Cache),
            FetchOutcome::Passthrough => panic!("active worker did not answer"),
        }

        network.gate.notify_one();
        let outcome = upgrade.await.unwrap().unwrap();
        assert!(matches!(outcome, RegisterOutcome::Activated(_)));
        assert_eq!(shell.status().await.unwrap().active_version, Some(2));
    }

    fn gated_slow_asset() -> Arc<GatedNetwork> {
        Arc::new(GatedNetwork {
            inner: ScriptedNetwork::serving(&["/", "/slow.js"]),
            gated_url: "/slow.js",
            gate: Notify::new(),
        })
    }

    async fn wait_for_install(shell: &ShellHandle, version: u32) {
        for _ in 0..100 {
            let status = shell.status().await.unwrap();
            if status.state == Some(WorkerState::Installing) && status.version == Some(version) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("shell v{version} never started installing");
    }

    #[tokio::test]
    async fn test_superseded_install_leaves_no_bucket() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let network = gated_slow_asset();
        let shell = ShellHandle::spawn(caches.clone(), network.clone());

        let first = {
            let shell = shell.clone();
            tokio::spawn(async move { shell.register(manifest(1, &["/", "/slow.js"])).await })
        };
        wait_for_install(&shell, 1).await;

        let outcome = shell.register(manifest(2, &["/"])).await.unwrap();
        assert!(matches!(outcome, RegisterOutcome::Activated(_)));
        assert!(matches!(
            first.await.unwrap().unwrap(),
            RegisterOutcome::Failed { version: 1, .. }
        ));

        // The old install must not come back and repopulate its bucket
        network.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(caches.keys().await.unwrap(), vec!["shell-v2"]);
        assert_eq!(shell.status().await.unwrap().active_version, Some(2));
    }

    #[tokio::test]
    async fn test_refresh_cancels_pending_install() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let network = gated_slow_asset();
        let shell = ShellHandle::spawn(caches.clone(), network.clone());

        let pending = {
            let shell = shell.clone();
            tokio::spawn(async move { shell.register(manifest(1, &["/", "/slow.js"])).await })
        };
        wait_for_install(&shell, 1).await;

        shell.refresh().await.unwrap();
        assert!(matches!(
            pending.await.unwrap().unwrap(),
            RegisterOutcome::Failed { version: 1, .. }
        ));

        network.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(caches.keys().await.unwrap().is_empty());
        assert_eq!(
            shell.fetch(ShellRequest::get("/")).await,
            FetchOutcome::Passthrough
        );
    }

    #[tokio::test]
    async fn test_refresh_clears_everything() {
        let caches = Arc::new(MemoryCacheStorage::new());
        let shell = ShellHandle::spawn(
            caches.clone(),
            Arc::new(ScriptedNetwork::serving(&["/"])),
        );
        shell.register(manifest(4, &["/"])).await.unwrap();

        let deleted = shell.refresh().await.unwrap();
        assert_eq!(deleted, vec!["shell-v4"]);
        assert!(caches.keys().await.unwrap().is_empty());

        let status = shell.status().await.unwrap();
        assert_eq!(status.state, Some(WorkerState::Redundant));
        assert_eq!(status.active_version, None);
        assert_eq!(
            shell.fetch(ShellRequest::get("/")).await,
            FetchOutcome::Passthrough
        );

        let outcome = shell.register(manifest(4, &["/"])).await.unwrap();
        assert!(matches!(outcome, RegisterOutcome::Activated(_)));
    }
}
