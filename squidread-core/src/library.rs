//! Library index over the book store
//!
//! The index is a projection recomputed on every [`Library::list`] call; no
//! incremental ordering is maintained.

use crate::error::{ExtractError, LibraryError, StorageError};
use crate::extract::{ExtractedMetadata, MetadataExtractor};
use crate::store::BookStore;
use crate::types::{compute_id, BookId, BookRecord, LocationToken};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// MIME type declared for EPUB files
pub const EPUB_MIME_TYPE: &str = "application/epub+zip";

/// Whether a selected file claims to be an EPUB, by extension or declared type
pub fn is_epub_file(name: &str, mime_type: Option<&str>) -> bool {
    mime_type == Some(EPUB_MIME_TYPE) || name.to_ascii_lowercase().ends_with(".epub")
}

/// Change notifications; subscribers re-render their library view
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    /// A new book was imported
    Imported { id: BookId, title: String },

    /// An import matched an existing book
    AlreadyPresent { id: BookId },

    /// A book was opened
    Opened { id: BookId },

    /// A stored record was rewritten
    Updated { id: BookId },

    /// A book was removed
    Deleted { id: BookId },
}

/// Result of importing content into the library
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// A new record was created
    Added(BookRecord),

    /// A record with the same content already existed; only `last_opened` moved
    AlreadyPresent(BookRecord),
}

impl ImportOutcome {
    pub fn record(&self) -> &BookRecord {
        match self {
            ImportOutcome::Added(record) | ImportOutcome::AlreadyPresent(record) => record,
        }
    }

    pub fn into_record(self) -> BookRecord {
        match self {
            ImportOutcome::Added(record) | ImportOutcome::AlreadyPresent(record) => record,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ImportOutcome::Added(_))
    }
}

/// Book summary without content, for listings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub title: String,
    pub size: usize,
    pub has_cover: bool,
    pub created_at: DateTime<Utc>,
    pub last_opened: DateTime<Utc>,
    pub last_location: Option<LocationToken>,
}

impl From<&BookRecord> for BookSummary {
    fn from(record: &BookRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name.clone(),
            title: record.title.clone(),
            size: record.size(),
            has_cover: record.cover_image.is_some(),
            created_at: record.created_at,
            last_opened: record.last_opened,
            last_location: record.last_location.clone(),
        }
    }
}

/// Ordered, event-emitting view over the [`BookStore`]
#[derive(Clone)]
pub struct Library {
    store: BookStore,
    extractor: Arc<dyn MetadataExtractor>,
    events: broadcast::Sender<LibraryEvent>,
}

impl Library {
    pub fn new(store: BookStore, extractor: Arc<dyn MetadataExtractor>) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            store,
            extractor,
            events,
        }
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    /// Subscribe to library change events
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: LibraryEvent) {
        // Ignore errors (no subscribers)
        let _ = self.events.send(event);
    }

    /// Import content, deduplicating by content hash
    pub async fn import(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> Result<ImportOutcome, LibraryError> {
        let id = compute_id(&content);
        tracing::info!("Persisting book {} ({} bytes) as {}", name, content.len(), id);

        if let Some(mut existing) = self.store.get(&id).await? {
            tracing::info!("Book already exists: {}", id);
            existing.last_opened = Utc::now();
            self.store.put(&existing).await?;
            self.emit(LibraryEvent::AlreadyPresent { id });
            return Ok(ImportOutcome::AlreadyPresent(existing));
        }

        let metadata = self.extract_metadata(&content).await;
        let record = BookRecord::new(name, metadata.title, content, metadata.cover, Utc::now());
        self.store.put(&record).await?;
        tracing::debug!("Book saved: {}", record.id);

        self.emit(LibraryEvent::Imported {
            id: record.id.clone(),
            title: record.title.clone(),
        });
        Ok(ImportOutcome::Added(record))
    }

    /// Extraction runs off the async workers; any failure degrades to defaults
    async fn extract_metadata(&self, content: &[u8]) -> ExtractedMetadata {
        let extractor = Arc::clone(&self.extractor);
        let bytes = content.to_vec();
        let result = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .unwrap_or_else(|e| Err(ExtractError::Task(e.to_string())));

        result.unwrap_or_else(|e| {
            tracing::warn!("Could not extract metadata from EPUB: {}", e);
            ExtractedMetadata::default()
        })
    }

    /// All records, most recently used first
    ///
    /// Covers stored as transient references are dropped and the record
    /// re-persisted along the way.
    pub async fn list(&self) -> Result<Vec<BookRecord>, LibraryError> {
        let mut records = self.store.get_all().await?;

        for record in records.iter_mut() {
            if record.cover_image.as_ref().is_some_and(|c| c.is_transient()) {
                record.cover_image = None;
                match self.store.put(record).await {
                    Ok(()) => self.emit(LibraryEvent::Updated {
                        id: record.id.clone(),
                    }),
                    Err(e) => tracing::warn!("Failed to normalize cover for {}: {}", record.id, e),
                }
            }
        }

        records.sort_by(|a, b| {
            b.effective_time()
                .cmp(&a.effective_time())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    /// The record to show when nothing else was asked for
    pub async fn most_recent(&self) -> Result<Option<BookRecord>, LibraryError> {
        Ok(self.list().await?.into_iter().next())
    }

    pub async fn get(&self, id: &BookId) -> Result<BookRecord, LibraryError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))
    }

    /// Mark a book as opened now and return its record
    pub async fn open(&self, id: &BookId) -> Result<BookRecord, LibraryError> {
        tracing::info!("Opening book: {}", id);
        let mut record = self.get(id).await?;
        record.last_opened = Utc::now();
        self.store.put(&record).await?;
        self.emit(LibraryEvent::Opened { id: id.clone() });
        Ok(record)
    }

    /// Store a new reading position, re-reading the record first
    pub async fn set_location(
        &self,
        id: &BookId,
        location: Option<LocationToken>,
    ) -> Result<BookRecord, LibraryError> {
        let mut record = self.get(id).await?;
        record.last_location = location;
        self.store.put(&record).await?;
        Ok(record)
    }

    /// Remove exactly one book
    pub async fn delete(&self, id: &BookId) -> Result<(), LibraryError> {
        match self.store.delete(id).await {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => return Err(LibraryError::NotFound(id.to_string())),
            Err(e) => return Err(e.into()),
        }
        tracing::info!("Deleted book: {}", id);
        self.emit(LibraryEvent::Deleted { id: id.clone() });
        Ok(())
    }
}
