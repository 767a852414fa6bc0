//! Offline application shell
//!
//! A background worker pre-populates a versioned cache bucket with the shell
//! manifest, garbage-collects buckets left by older versions, and answers
//! intercepted requests cache-first with a network and then a synthetic
//! `503` fallback.

mod cache;
mod manifest;
mod request;
mod runtime;
mod worker;

pub use cache::{CacheStorage, MemoryCacheStorage, PersistentCacheStorage};
pub use manifest::{ShellManifest, DEFAULT_SHELL_ASSETS, DEFAULT_SHELL_PREFIX, DEFAULT_SHELL_VERSION};
pub use request::{Fetcher, ShellRequest, ShellResponse};
pub use runtime::{ActivationReport, RegisterOutcome, ShellHandle, ShellStatus};
pub use worker::{FetchOutcome, InstallReport, ResponseSource, ShellWorker, WorkerState};
