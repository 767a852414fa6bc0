//! The network as seen by the shell worker
//!
//! Same-origin URLs are served from the shell directory. Third-party script
//! URLs resolve to a local mirror under `vendor/<host>/<path>`; an asset that
//! was never mirrored behaves like an unreachable host.

use async_trait::async_trait;
use http::StatusCode;
use squidread_core::error::FetchError;
use squidread_core::shell::{Fetcher, ShellRequest, ShellResponse};
use std::path::{Component, Path, PathBuf};

/// Directory-backed origin for shell assets
#[derive(Debug, Clone)]
pub struct ShellOrigin {
    root: PathBuf,
}

impl ShellOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL to a file below the root
    fn resolve(&self, url: &str) -> Result<(PathBuf, bool), FetchError> {
        let url = url.split(['?', '#']).next().unwrap_or_default();

        let (relative, mirrored) = if let Some(path) = url.strip_prefix('/') {
            (path.to_string(), false)
        } else if let Some(rest) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        {
            (format!("vendor/{}", rest), true)
        } else {
            return Err(FetchError::UnsupportedUrl(url.to_string()));
        };

        let relative = if relative.is_empty() || relative.ends_with('/') {
            format!("{}index.html", relative)
        } else {
            relative
        };

        let mut path = self.root.clone();
        for component in Path::new(&relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(FetchError::UnsupportedUrl(url.to_string())),
            }
        }
        Ok((path, mirrored))
    }
}

/// Content type from a file extension
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") | Some("webmanifest") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("epub") => "application/epub+zip",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Fetcher for ShellOrigin {
    async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, FetchError> {
        let (path, mirrored) = self.resolve(&request.url)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(ShellResponse::ok(content_type_for(&path), body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if mirrored {
                    Err(FetchError::Network(format!(
                        "{} is not mirrored locally",
                        request.url
                    )))
                } else {
                    Ok(ShellResponse::new(
                        StatusCode::NOT_FOUND,
                        Some("text/plain".to_string()),
                        b"Not Found".to_vec(),
                    ))
                }
            }
            Err(e) => Err(FetchError::Network(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn origin() -> (ShellOrigin, TempDir) {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("index.html"), "<html></html>")
            .await
            .unwrap();
        let vendor = dir.path().join("vendor/cdn.example.com/lib");
        tokio::fs::create_dir_all(&vendor).await.unwrap();
        tokio::fs::write(vendor.join("x.js"), "x()").await.unwrap();
        (ShellOrigin::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let (origin, _dir) = origin().await;
        for url in ["/", "/index.html", "/index.html?v=2"] {
            let response = origin.fetch(&ShellRequest::get(url)).await.unwrap();
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body, b"<html></html>");
            assert_eq!(
                response.content_type.as_deref(),
                Some("text/html; charset=utf-8")
            );
        }
    }

    #[tokio::test]
    async fn test_missing_local_file_is_404() {
        let (origin, _dir) = origin().await;
        let response = origin.fetch(&ShellRequest::get("/nope.css")).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_third_party_urls_use_the_mirror() {
        let (origin, _dir) = origin().await;
        let response = origin
            .fetch(&ShellRequest::get("https://cdn.example.com/lib/x.js"))
            .await
            .unwrap();
        assert_eq!(response.body, b"x()");

        let missing = origin
            .fetch(&ShellRequest::get("https://cdn.example.com/lib/y.js"))
            .await;
        assert!(matches!(missing, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let (origin, _dir) = origin().await;
        let result = origin.fetch(&ShellRequest::get("/../secret")).await;
        assert!(matches!(result, Err(FetchError::UnsupportedUrl(_))));
    }
}
