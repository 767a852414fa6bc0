//! Opaque reading-position tokens

use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical fragment identifier into a book's content (an EPUB CFI)
///
/// The token is opaque to everything except the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationToken(String);

impl LocationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token uses the `epubcfi(...)` form
    pub fn is_cfi(&self) -> bool {
        self.0.starts_with("epubcfi(") && self.0.ends_with(')')
    }
}

impl fmt::Display for LocationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LocationToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}
