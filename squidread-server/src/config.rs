//! Server configuration from environment variables

use anyhow::{Context, Result};
use squidread_core::shell::DEFAULT_SHELL_VERSION;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime settings
///
/// | Variable                  | Default            |
/// |---------------------------|--------------------|
/// | `SQUIDREAD_STORAGE_PATH`  | `./squidread_data` |
/// | `SQUIDREAD_BIND`          | `127.0.0.1:3000`   |
/// | `SQUIDREAD_SHELL_DIR`     | `./shell`          |
/// | `SQUIDREAD_SHELL_VERSION` | built-in version   |
/// | `SQUIDREAD_CORS_ORIGINS`  | localhost origins  |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root for book records, the last-opened pointer and shell caches
    pub storage_path: PathBuf,
    pub bind: SocketAddr,
    /// Directory the offline shell is served from
    pub shell_dir: PathBuf,
    pub shell_version: u32,
    /// Comma-separated origins, or `*`
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./squidread_data"),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            shell_dir: PathBuf::from("./shell"),
            shell_version: DEFAULT_SHELL_VERSION,
            cors_origins: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("SQUIDREAD_STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }
        if let Some(bind) = lookup("SQUIDREAD_BIND") {
            config.bind = bind
                .parse()
                .with_context(|| format!("Invalid SQUIDREAD_BIND: {}", bind))?;
        }
        if let Some(dir) = lookup("SQUIDREAD_SHELL_DIR") {
            config.shell_dir = PathBuf::from(dir);
        }
        if let Some(version) = lookup("SQUIDREAD_SHELL_VERSION") {
            config.shell_version = version
                .parse()
                .with_context(|| format!("Invalid SQUIDREAD_SHELL_VERSION: {}", version))?;
        }
        config.cors_origins = lookup("SQUIDREAD_CORS_ORIGINS");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.shell_version, DEFAULT_SHELL_VERSION);
        assert!(config.cors_origins.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SQUIDREAD_BIND", "0.0.0.0:8080"),
            ("SQUIDREAD_SHELL_VERSION", "7"),
            ("SQUIDREAD_STORAGE_PATH", "/var/lib/squidread"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.shell_version, 7);
        assert_eq!(config.storage_path, PathBuf::from("/var/lib/squidread"));
    }

    #[test]
    fn test_bad_version_is_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("SQUIDREAD_SHELL_VERSION", "two")])).is_err());
    }
}
