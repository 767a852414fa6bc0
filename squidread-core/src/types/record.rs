//! The persisted book record

use super::{BookId, CoverImage, LocationToken};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One imported EPUB and its reading state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecord {
    /// Content-addressed identifier
    pub id: BookId,

    /// Original filename
    pub name: String,

    /// Metadata title, or the filename without its extension
    pub title: String,

    /// Raw EPUB bytes
    #[serde(with = "super::base64_serde")]
    pub content: Vec<u8>,

    /// Cover image as a self-contained data URL
    #[serde(default)]
    pub cover_image: Option<CoverImage>,

    /// First import time
    pub created_at: DateTime<Utc>,

    /// Last time the book was opened
    pub last_opened: DateTime<Utc>,

    /// Where the reader left off
    #[serde(default)]
    pub last_location: Option<LocationToken>,
}

impl BookRecord {
    /// Create a record for freshly imported content
    ///
    /// The id is derived from `content`; `created_at` and `last_opened` are both `now`.
    pub fn new(
        name: impl Into<String>,
        title: Option<String>,
        content: Vec<u8>,
        cover_image: Option<CoverImage>,
        now: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_filename(&name));
        Self {
            id: BookId::from_content(&content),
            name,
            title,
            content,
            cover_image,
            created_at: now,
            last_opened: now,
            last_location: None,
        }
    }

    /// `max(last_opened, created_at)`, the key the library orders by
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.last_opened.max(self.created_at)
    }

    /// Size of the stored content in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Filename with its last extension stripped
pub fn title_from_filename(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}
