//! Squidread Core Library
//!
//! Content-addressed EPUB library, reading-position persistence and the
//! versioned offline shell cache behind the Squidread reader. Books are keyed
//! by a truncated SHA-256 of their bytes, so importing the same file twice
//! yields one record.

pub mod error;
pub mod extract;
pub mod library;
pub mod reading;
pub mod shell;
pub mod storage;
pub mod store;
pub mod types;

pub use error::{
    CacheError, FetchError, ImportError, LibraryError, ReaderError, RenderError, StorageError,
};
pub use extract::{EpubExtractor, ExtractedMetadata, MetadataExtractor};
pub use library::{is_epub_file, BookSummary, ImportOutcome, Library, LibraryEvent};
pub use reading::{
    Action, ActionOutcome, BestEffort, LastOpenedPointer, Notice, Reader, RenderingEngine,
    SessionInfo, Trigger, Viewport,
};
pub use store::BookStore;
pub use types::{compute_id, BookId, BookRecord, CoverImage, LocationToken, TocEntry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bytes_share_an_id() {
        let content = b"PK\x03\x04 not really a zip";
        assert_eq!(compute_id(content), compute_id(&content.to_vec()));
        assert_ne!(compute_id(content), compute_id(b"PK\x03\x04 another"));
    }
}
