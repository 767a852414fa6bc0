//! Remembers which book was open last, across restarts

use crate::storage::StorageProvider;
use crate::types::BookId;
use std::sync::Arc;

const POINTER_PATH: &str = "last_opened_book";

/// Best-effort pointer to the most recently opened book
#[derive(Clone)]
pub struct LastOpenedPointer {
    storage: Arc<dyn StorageProvider>,
}

impl LastOpenedPointer {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    /// The remembered id, if one is stored and still well-formed
    pub async fn load(&self) -> Option<BookId> {
        let data = match self.storage.read(POINTER_PATH).await {
            Ok(data) => data,
            Err(crate::error::StorageError::NotFound(_)) => return None,
            Err(e) => {
                tracing::warn!("Failed to read last opened book: {}", e);
                return None;
            }
        };
        let value = String::from_utf8_lossy(&data);
        BookId::parse(value.trim()).ok()
    }

    pub async fn remember(&self, id: &BookId) {
        if let Err(e) = self
            .storage
            .write(POINTER_PATH, id.as_str().as_bytes().to_vec())
            .await
        {
            tracing::warn!("Failed to remember last opened book: {}", e);
        }
    }

    pub async fn clear(&self) {
        match self.storage.delete(POINTER_PATH).await {
            Ok(()) | Err(crate::error::StorageError::NotFound(_)) => {}
            Err(e) => tracing::warn!("Failed to clear last opened book: {}", e),
        }
    }
}
