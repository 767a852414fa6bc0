//! Named cache buckets holding response snapshots

use super::request::ShellResponse;
use crate::error::{CacheError, StorageError};
use crate::storage::StorageProvider;
use async_trait::async_trait;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Collection of named buckets keyed by request URL
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist yet
    async fn open(&self, bucket: &str) -> Result<(), CacheError>;

    /// Store a response under `url` in `bucket`, replacing any previous one
    async fn put(&self, bucket: &str, url: &str, response: &ShellResponse)
        -> Result<(), CacheError>;

    /// Find a response for `url`, searching buckets in `keys()` order
    async fn lookup(&self, url: &str) -> Result<Option<ShellResponse>, CacheError>;

    /// Names of all buckets
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// URLs stored in a bucket
    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError>;

    /// Remove a bucket; `false` if it did not exist
    async fn delete(&self, bucket: &str) -> Result<bool, CacheError>;
}

/// In-process buckets; contents vanish with the process
#[derive(Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<Vec<(String, BTreeMap<String, ShellResponse>)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, bucket: &str) -> Result<(), CacheError> {
        let mut buckets = self.buckets.write().await;
        if !buckets.iter().any(|(name, _)| name == bucket) {
            buckets.push((bucket.to_string(), BTreeMap::new()));
        }
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        url: &str,
        response: &ShellResponse,
    ) -> Result<(), CacheError> {
        let mut buckets = self.buckets.write().await;
        let index = match buckets.iter().position(|(name, _)| name == bucket) {
            Some(index) => index,
            None => {
                buckets.push((bucket.to_string(), BTreeMap::new()));
                buckets.len() - 1
            }
        };
        buckets[index].1.insert(url.to_string(), response.clone());
        Ok(())
    }

    async fn lookup(&self, url: &str) -> Result<Option<ShellResponse>, CacheError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find_map(|(_, entries)| entries.get(url).cloned()))
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, entries)| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|(name, _)| name != bucket);
        Ok(buckets.len() != before)
    }
}

const CACHE_DIR: &str = "cache";
const BUCKET_MARKER: &str = ".bucket";

/// On-disk form of one cached response
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    url: String,
    status: u16,
    content_type: Option<String>,
    #[serde(with = "crate::types::base64_serde")]
    body: Vec<u8>,
}

/// Buckets persisted through a [`StorageProvider`] at `cache/<bucket>/<sha256(url)>.json`
pub struct PersistentCacheStorage {
    storage: Arc<dyn StorageProvider>,
}

impl PersistentCacheStorage {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    fn bucket_dir(bucket: &str) -> Result<String, CacheError> {
        let valid = !bucket.is_empty()
            && !bucket.starts_with('.')
            && bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(format!("{}/{}", CACHE_DIR, bucket))
        } else {
            Err(CacheError::InvalidBucket(bucket.to_string()))
        }
    }

    fn entry_path(bucket: &str, url: &str) -> Result<String, CacheError> {
        let key = hex::encode(Sha256::digest(url.as_bytes()));
        Ok(format!("{}/{}.json", Self::bucket_dir(bucket)?, key))
    }

    async fn read_entry(&self, path: &str) -> Result<Option<StoredEntry>, CacheError> {
        match self.storage.read(path).await {
            Ok(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| CacheError::Corrupt(format!("{}: {}", path, e))),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStorage for PersistentCacheStorage {
    async fn open(&self, bucket: &str) -> Result<(), CacheError> {
        let marker = format!("{}/{}", Self::bucket_dir(bucket)?, BUCKET_MARKER);
        if !self.storage.exists(&marker).await? {
            self.storage.write(&marker, Vec::new()).await?;
        }
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        url: &str,
        response: &ShellResponse,
    ) -> Result<(), CacheError> {
        self.open(bucket).await?;
        let entry = StoredEntry {
            url: url.to_string(),
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            body: response.body.clone(),
        };
        let data = serde_json::to_vec(&entry).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        self.storage
            .write(&Self::entry_path(bucket, url)?, data)
            .await?;
        Ok(())
    }

    async fn lookup(&self, url: &str) -> Result<Option<ShellResponse>, CacheError> {
        for bucket in self.keys().await? {
            let path = Self::entry_path(&bucket, url)?;
            match self.read_entry(&path).await {
                Ok(Some(entry)) if entry.url == url => {
                    let status = StatusCode::from_u16(entry.status)
                        .map_err(|e| CacheError::Corrupt(format!("{}: {}", path, e)))?;
                    return Ok(Some(ShellResponse::new(
                        status,
                        entry.content_type,
                        entry.body,
                    )));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring unreadable cache entry: {}", e),
            }
        }
        Ok(None)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut buckets = Vec::new();
        for name in self.storage.list(CACHE_DIR).await? {
            let marker = format!("{}/{}/{}", CACHE_DIR, name, BUCKET_MARKER);
            if self.storage.exists(&marker).await? {
                buckets.push(name);
            }
        }
        Ok(buckets)
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        let dir = Self::bucket_dir(bucket)?;
        let mut urls = Vec::new();
        for name in self.storage.list(&dir).await? {
            if !name.ends_with(".json") {
                continue;
            }
            if let Some(entry) = self.read_entry(&format!("{}/{}", dir, name)).await? {
                urls.push(entry.url);
            }
        }
        urls.sort();
        Ok(urls)
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        let dir = Self::bucket_dir(bucket)?;
        let existed = self
            .storage
            .exists(&format!("{}/{}", dir, BUCKET_MARKER))
            .await?;
        self.storage.delete_dir(&dir).await?;
        Ok(existed)
    }
}
