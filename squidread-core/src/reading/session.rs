//! The active reading session

use crate::types::{BookId, BookRecord, LocationToken, TocEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// State that exists only while a book is open
///
/// Created when a book is opened, dropped when it is closed or deleted.
#[derive(Debug, Clone)]
pub struct ReadingSession {
    /// Latest known copy of the book's record
    pub record: BookRecord,

    pub toc: Vec<TocEntry>,

    /// Whether the engine's location index is available for progress
    pub locations_ready: bool,

    /// Approximate progress through the book, `0.0..=1.0`
    pub progress: Option<f32>,

    pub opened_at: DateTime<Utc>,
}

impl ReadingSession {
    pub fn new(record: BookRecord, toc: Vec<TocEntry>) -> Self {
        Self {
            record,
            toc,
            locations_ready: false,
            progress: None,
            opened_at: Utc::now(),
        }
    }

    pub fn book_id(&self) -> &BookId {
        &self.record.id
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.record.id.to_string(),
            title: self.record.title.clone(),
            location: self.record.last_location.clone(),
            progress: self.progress,
            locations_ready: self.locations_ready,
            toc: self.toc.clone(),
        }
    }
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub location: Option<LocationToken>,
    pub progress: Option<f32>,
    pub locations_ready: bool,
    pub toc: Vec<TocEntry>,
}
