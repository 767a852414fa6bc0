//! Title and cover extraction at import time
//!
//! Only what the library needs is read from the EPUB; rendering is left to
//! the rendering engine.

use crate::error::ExtractError;
use crate::types::CoverImage;
use std::io::Cursor;

/// Metadata pulled out of an EPUB during import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub cover: Option<CoverImage>,
}

/// Reads import metadata from raw book content
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, content: &[u8]) -> Result<ExtractedMetadata, ExtractError>;
}

/// Extractor backed by the `epub` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubExtractor;

impl EpubExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for EpubExtractor {
    fn extract(&self, content: &[u8]) -> Result<ExtractedMetadata, ExtractError> {
        let cursor = Cursor::new(content.to_vec());
        let mut doc = epub::doc::EpubDoc::from_reader(cursor)
            .map_err(|e| ExtractError::InvalidEpub(e.to_string()))?;

        let title = doc
            .mdata("title")
            .map(|item| item.value.trim().to_string())
            .filter(|title| !title.is_empty());

        // A missing or unreadable cover only loses the cover
        let cover = match doc.get_cover() {
            Some((data, mime)) if !data.is_empty() => Some(CoverImage::from_bytes(&mime, &data)),
            Some(_) => {
                tracing::warn!("Could not extract cover image: empty cover resource");
                None
            }
            None => {
                tracing::debug!("EPUB declares no cover image");
                None
            }
        };

        Ok(ExtractedMetadata { title, cover })
    }
}
