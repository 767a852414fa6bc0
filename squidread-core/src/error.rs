//! Error types for Squidread Core

use thiserror::Error;

/// Errors that occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Corrupt record {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Errors that reject an import before anything is persisted
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Not an EPUB file: {0}")]
    NotEpub(String),

    #[error("Failed to read file: {0}")]
    ReadFailed(String),

    #[error("Another import is already in progress")]
    Busy,
}

/// Errors surfaced by library operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Book not found: {0}")]
    NotFound(String),

    #[error("Invalid book id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Metadata extraction failures; never abort an import
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Errors reported by the rendering engine collaborator
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to open book: {0}")]
    Open(String),

    #[error("Failed to display location: {0}")]
    Display(String),

    #[error("Location index unavailable: {0}")]
    Locations(String),

    #[error("Table of contents unavailable: {0}")]
    Toc(String),
}

/// Errors surfaced by the reader controller
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to open book: {0}")]
    OpenFailed(#[source] RenderError),

    #[error("No book is open")]
    NoSession,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Errors raised by a network fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network unavailable: {0}")]
    Network(String),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
}

/// Errors raised by the offline cache manager
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("Invalid cache bucket name: {0}")]
    InvalidBucket(String),

    #[error("Shell worker is not running")]
    WorkerGone,
}
