//! Content-addressed book record store
//!
//! Records are kept as JSON documents at `books/<id>.json` on any
//! [`StorageProvider`]. Every mutation replaces the whole record.

use crate::error::StorageError;
use crate::storage::{StorageProvider, StorageResult};
use crate::types::{BookId, BookRecord};
use std::sync::Arc;

const BOOKS_DIR: &str = "books";

/// Persistent key-value store of [`BookRecord`]s keyed by [`BookId`]
#[derive(Clone)]
pub struct BookStore {
    storage: Arc<dyn StorageProvider>,
}

impl BookStore {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    fn record_path(id: &BookId) -> String {
        format!("{}/{}.json", BOOKS_DIR, id)
    }

    /// Insert or replace a record
    pub async fn put(&self, record: &BookRecord) -> StorageResult<()> {
        let data = serde_json::to_vec(record).map_err(|e| StorageError::Corrupt {
            path: Self::record_path(&record.id),
            reason: e.to_string(),
        })?;
        self.storage.write(&Self::record_path(&record.id), data).await
    }

    /// Fetch a record; `Ok(None)` if there is none with this id
    pub async fn get(&self, id: &BookId) -> StorageResult<Option<BookRecord>> {
        let path = Self::record_path(id);
        let data = match self.storage.read(&path).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path,
                reason: e.to_string(),
            })
    }

    /// Every stored record, in no particular order
    ///
    /// Documents that fail to decode are logged and skipped.
    pub async fn get_all(&self) -> StorageResult<Vec<BookRecord>> {
        let mut records = Vec::new();
        for name in self.storage.list(BOOKS_DIR).await? {
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            let Ok(id) = BookId::parse(stem) else {
                tracing::warn!("Ignoring unexpected file in book store: {}", name);
                continue;
            };
            match self.get(&id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable record {}: {}", id, e),
            }
        }
        Ok(records)
    }

    /// Remove a record; `NotFound` if it does not exist
    pub async fn delete(&self, id: &BookId) -> StorageResult<()> {
        self.storage.delete(&Self::record_path(id)).await
    }

    pub async fn contains(&self, id: &BookId) -> StorageResult<bool> {
        self.storage.exists(&Self::record_path(id)).await
    }
}
