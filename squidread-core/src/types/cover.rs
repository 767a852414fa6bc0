//! Self-contained cover images

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// A cover image encoded as a `data:` URL so it survives restarts
///
/// Older records may carry a `blob:` reference, which only lived as long as
/// the page that created it. Those are treated as transient and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverImage(String);

impl CoverImage {
    /// Encode raw image bytes as a data URL
    pub fn from_bytes(mime_type: &str, data: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", mime_type, STANDARD.encode(data)))
    }

    /// Wrap an already encoded URL as found in a stored record
    pub fn from_url(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_url(&self) -> &str {
        &self.0
    }

    /// Whether this is a self-contained `data:` URL
    pub fn is_embedded(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Whether this is a reference that cannot outlive its creator
    pub fn is_transient(&self) -> bool {
        self.0.starts_with("blob:")
    }

    /// Decode into `(mime_type, bytes)`; `None` unless embedded as base64
    pub fn decode(&self) -> Option<(String, Vec<u8>)> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        let data = STANDARD.decode(payload).ok()?;
        Some((mime_type.to_string(), data))
    }
}
