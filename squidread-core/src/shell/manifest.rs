//! The fixed list of assets baked into the offline shell

use serde::Serialize;

pub const DEFAULT_SHELL_PREFIX: &str = "squidread-shell";

/// Bump on every deployable change to invalidate older shell caches
pub const DEFAULT_SHELL_VERSION: u32 = 2;

pub const DEFAULT_SHELL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "https://cdn.jsdelivr.net/npm/jszip@3.10.1/dist/jszip.min.js",
    "https://cdn.jsdelivr.net/npm/epubjs@0.3/dist/epub.min.js",
];

/// Versioned set of URLs pre-populated at install time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellManifest {
    pub prefix: String,
    pub version: u32,
    pub assets: Vec<String>,
}

impl ShellManifest {
    pub fn new(prefix: impl Into<String>, version: u32, assets: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version,
            assets,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Name of the bucket this version installs into, e.g. `squidread-shell-v2`
    pub fn cache_name(&self) -> String {
        format!("{}-v{}", self.prefix, self.version)
    }
}

impl Default for ShellManifest {
    fn default() -> Self {
        Self::new(
            DEFAULT_SHELL_PREFIX,
            DEFAULT_SHELL_VERSION,
            DEFAULT_SHELL_ASSETS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_name_embeds_version() {
        let manifest = ShellManifest::default();
        assert_eq!(manifest.cache_name(), "squidread-shell-v2");
        assert_eq!(manifest.assets.len(), 6);
        assert_eq!(manifest.with_version(3).cache_name(), "squidread-shell-v3");
    }
}
