//! Storage abstraction layer for book records and cached shell responses

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Abstract storage provider trait
///
/// Paths are `/`-separated and relative to the provider's root.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Read data from the given path
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Write data to the given path, replacing any previous content
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Delete the file at the given path
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Delete a directory and everything under it
    async fn delete_dir(&self, path: &str) -> StorageResult<()>;

    /// Names of the entries directly under `prefix`; empty if it does not exist
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check if a path exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;
}

/// Local filesystem storage provider
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage provider with the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Safely resolve a path, preventing path traversal attacks
    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        let mut normalized = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => normalized.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(StorageError::PermissionDenied(format!(
                        "path traversal attempt: {path}"
                    )));
                }
            }
        }

        Ok(self.root.join(normalized))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path)?;
        tokio::fs::read(full_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::BackendError(e.to_string()),
        })
    }

    /// Writes to a temp file then renames, so readers never see a partial record
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::BackendError(e.to_string()))?;
        }
        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        tokio::fs::write(&temp_path, data)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        tokio::fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        tokio::fs::remove_file(full_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
                _ => StorageError::BackendError(e.to_string()),
            })
    }

    async fn delete_dir(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        match tokio::fs::remove_dir_all(full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let full_path = self.full_path(prefix)?;
        let mut read_dir = match tokio::fs::read_dir(&full_path).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?
        {
            if let Some(name) = entry.file_name().to_str() {
                // In-flight temp files from `write`
                if !name.ends_with(".tmp") {
                    entries.push(name.to_string());
                }
            }
        }
        entries.sort();
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full_path = self.full_path(path)?;
        tokio::fs::try_exists(full_path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }
}

/// In-memory storage provider (for testing)
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StorageError {
        StorageError::BackendError("memory storage lock poisoned".to_string())
    }

    fn dir_prefix(prefix: &str) -> String {
        let trimmed = prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.data
            .read()
            .map_err(|_| Self::poisoned())?
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(())
    }

    async fn delete_dir(&self, path: &str) -> StorageResult<()> {
        let prefix = Self::dir_prefix(path);
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = Self::dir_prefix(prefix);
        let data = self.data.read().map_err(|_| Self::poisoned())?;
        let names: BTreeSet<String> = data
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self
            .data
            .read()
            .map_err(|_| Self::poisoned())?
            .contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.write("books/a.json", b"hello".to_vec()).await.unwrap();

        let data = storage.read("books/a.json").await.unwrap();
        assert_eq!(data, b"hello");

        assert!(storage.exists("books/a.json").await.unwrap());
        assert!(!storage.exists("books/missing.json").await.unwrap());

        storage.delete("books/a.json").await.unwrap();
        assert!(!storage.exists("books/a.json").await.unwrap());
        assert!(matches!(
            storage.delete("books/a.json").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_list_returns_direct_children() {
        let storage = MemoryStorage::new();
        storage.write("cache/v1/a.json", vec![1]).await.unwrap();
        storage.write("cache/v1/b.json", vec![2]).await.unwrap();
        storage.write("cache/v2/a.json", vec![3]).await.unwrap();
        storage.write("books/x.json", vec![4]).await.unwrap();

        assert_eq!(storage.list("cache").await.unwrap(), vec!["v1", "v2"]);
        assert_eq!(
            storage.list("cache/v1").await.unwrap(),
            vec!["a.json", "b.json"]
        );
        assert!(storage.list("nothing").await.unwrap().is_empty());

        storage.delete_dir("cache/v1").await.unwrap();
        assert_eq!(storage.list("cache").await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("books/a.json", b"one".to_vec()).await.unwrap();
        storage.write("books/a.json", b"two".to_vec()).await.unwrap();
        assert_eq!(storage.read("books/a.json").await.unwrap(), b"two");
        assert_eq!(storage.list("books").await.unwrap(), vec!["a.json"]);
        assert!(storage.list("missing").await.unwrap().is_empty());

        assert!(matches!(
            storage.read("books/b.json").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(matches!(
            storage.read("../etc/passwd").await,
            Err(StorageError::PermissionDenied(_))
        ));
    }
}
