//! Requests and responses as seen by the shell worker

use crate::error::FetchError;
use async_trait::async_trait;
use http::{Method, StatusCode};

/// URL schemes for locally generated content that must reach the origin untouched
const EXCLUDED_SCHEMES: &[&str] = &["blob:", "data:"];

/// A request issued by the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRequest {
    pub method: Method,
    pub url: String,
}

impl ShellRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Only GETs for storable URLs go through the cache
    pub fn is_intercepted(&self) -> bool {
        self.method == Method::GET
            && !EXCLUDED_SCHEMES
                .iter()
                .any(|scheme| self.url.starts_with(scheme))
    }
}

/// A response snapshot, as stored in a cache bucket or returned by the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ShellResponse {
    pub fn new(status: StatusCode, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::OK, Some(content_type.to_string()), body.into())
    }

    /// Synthetic reply used when neither the cache nor the network can answer
    pub fn offline() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            Some("text/plain".to_string()),
            b"Offline".to_vec(),
        )
    }
}

/// The network as seen from the worker
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, FetchError>;
}
