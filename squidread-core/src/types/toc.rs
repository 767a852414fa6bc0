//! Table of contents as reported by the rendering engine

use serde::{Deserialize, Serialize};

/// A single entry in the table of contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TocEntry {
    /// Display label
    pub label: String,

    /// Target href within the book, possibly with a `#fragment`
    pub href: String,

    /// Child entries for nested TOC
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    /// Create a new TOC entry
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    /// Add child entries
    pub fn with_children(mut self, children: Vec<TocEntry>) -> Self {
        self.children = children;
        self
    }

    /// The href with any `#fragment` removed
    pub fn base_href(&self) -> &str {
        strip_fragment(&self.href)
    }
}

/// Strip a `#fragment` suffix from an href
pub fn strip_fragment(href: &str) -> &str {
    href.split_once('#').map_or(href, |(base, _)| base)
}
