//! The external rendering engine collaborator

use crate::error::RenderError;
use crate::types::{LocationToken, TocEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Characters per generated location when building the progress index
pub const CHARS_PER_LOCATION: usize = 1024;

/// Size of the region the engine renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Parses, paginates and displays EPUB content
///
/// Implementations own their pagination state; the reader only hands over
/// bytes, a viewport and location tokens.
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Open content from raw bytes, replacing whatever was open before
    async fn open(&self, content: &[u8]) -> Result<(), RenderError>;

    /// Lay the book out into a viewport
    async fn render(&self, viewport: Viewport) -> Result<(), RenderError>;

    /// Show a location; `None` starts from the beginning
    async fn display(&self, location: Option<&LocationToken>) -> Result<(), RenderError>;

    /// Show a content document by href (table-of-contents navigation)
    async fn display_href(&self, href: &str) -> Result<(), RenderError>;

    /// Location of the page currently shown, once navigation has settled
    fn current_location(&self) -> Option<LocationToken>;

    async fn table_of_contents(&self) -> Result<Vec<TocEntry>, RenderError>;

    /// Build the location index used for progress; returns the location count
    async fn generate_locations(&self, chars_per_location: usize) -> Result<usize, RenderError>;

    /// Approximate position within the whole work, `0.0..=1.0`
    fn percentage(&self, location: &LocationToken) -> Option<f32>;

    /// Release the open book
    async fn close(&self);
}
