//! CLI command implementations

mod delete;
mod export;
mod id;
mod import;
mod list;
mod open;

pub use delete::delete;
pub use export::export;
pub use id::id;
pub use import::import;
pub use list::list;
pub use open::{locate, open};

use anyhow::{Context as _, Result};
use squidread_core::reading::LastOpenedPointer;
use squidread_core::storage::{LocalStorage, StorageProvider};
use squidread_core::{BookId, BookStore, EpubExtractor, Library};
use std::path::Path;
use std::sync::Arc;

/// The library and last-opened pointer over one data directory
///
/// Uses the same layout as the server, so both can share a data directory.
pub struct Context {
    pub library: Library,
    pub pointer: LastOpenedPointer,
}

impl Context {
    pub fn new(data_dir: &Path) -> Self {
        tracing::debug!("Using data directory {}", data_dir.display());
        let storage: Arc<dyn StorageProvider> = Arc::new(LocalStorage::new(data_dir));
        Self {
            library: Library::new(
                BookStore::new(storage.clone()),
                Arc::new(EpubExtractor::new()),
            ),
            pointer: LastOpenedPointer::new(storage),
        }
    }
}

fn parse_id(id: &str) -> Result<BookId> {
    BookId::parse(id).with_context(|| format!("'{}' is not a book id", id))
}
