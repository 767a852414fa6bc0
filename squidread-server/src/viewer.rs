//! Rendering engine for a browser-side viewer
//!
//! Pages are laid out in the client. The server parses the same EPUB to
//! validate it, build the table of contents and the location index, and
//! tracks the location the client last reported.

use async_trait::async_trait;
use squidread_core::error::RenderError;
use squidread_core::reading::{RenderingEngine, Viewport};
use squidread_core::types::{LocationToken, TocEntry};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct OpenBook {
    toc: Vec<TocEntry>,
    /// Visible characters per spine document, in reading order
    sections: Vec<usize>,
    hrefs: HashSet<String>,
    viewport: Option<Viewport>,
    locations: Option<usize>,
    current: Option<LocationToken>,
    target_href: Option<String>,
}

impl OpenBook {
    fn parse(content: Vec<u8>) -> Result<Self, RenderError> {
        let mut doc = epub::doc::EpubDoc::from_reader(Cursor::new(content))
            .map_err(|e| RenderError::Open(e.to_string()))?;

        let toc: Vec<TocEntry> = doc.toc.iter().map(toc_entry).collect();
        let mut hrefs = HashSet::new();
        collect_hrefs(&toc, &mut hrefs);

        let spine: Vec<String> = doc.spine.iter().map(|item| item.idref.clone()).collect();
        if spine.is_empty() {
            return Err(RenderError::Open("EPUB has an empty spine".to_string()));
        }
        let sections = spine
            .into_iter()
            .map(|idref| {
                doc.get_resource_str(&idref)
                    .map(|(html, _mime)| visible_chars(&html))
                    .unwrap_or(0)
            })
            .collect();

        Ok(Self {
            toc,
            sections,
            hrefs,
            ..Self::default()
        })
    }

    fn total_chars(&self) -> usize {
        self.sections.iter().sum()
    }
}

fn toc_entry(nav: &epub::doc::NavPoint) -> TocEntry {
    TocEntry::new(nav.label.clone(), nav.content.to_string_lossy().to_string())
        .with_children(nav.children.iter().map(toc_entry).collect())
}

fn collect_hrefs(entries: &[TocEntry], hrefs: &mut HashSet<String>) {
    for entry in entries {
        hrefs.insert(entry.href.clone());
        hrefs.insert(entry.base_href().to_string());
        collect_hrefs(&entry.children, hrefs);
    }
}

/// Characters outside markup, roughly what the client lays out
fn visible_chars(html: &str) -> usize {
    let mut in_tag = false;
    html.chars()
        .filter(|&c| match c {
            '<' => {
                in_tag = true;
                false
            }
            '>' => {
                in_tag = false;
                false
            }
            c => !in_tag && !c.is_whitespace(),
        })
        .count()
}

/// Spine position addressed by an EPUB CFI, e.g. `epubcfi(/6/4!/4/2)` is item 1
fn cfi_spine_index(location: &LocationToken) -> Option<usize> {
    let path = location.as_str().strip_prefix("epubcfi(/6/")?;
    let step: usize = path
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()?;
    (step >= 2 && step % 2 == 0).then(|| step / 2 - 1)
}

/// Server half of a client-rendered viewer
#[derive(Default)]
pub struct ClientViewer {
    book: RwLock<Option<OpenBook>>,
}

impl ClientViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a location the client settled on
    pub fn settle(&self, location: LocationToken) {
        if let Some(book) = self.write().as_mut() {
            book.current = Some(location);
            book.target_href = None;
        }
    }

    /// The href the client was last asked to navigate to, until it settles
    pub fn target_href(&self) -> Option<String> {
        self.read().as_ref().and_then(|b| b.target_href.clone())
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.read().as_ref().and_then(|b| b.viewport)
    }

    pub fn is_open(&self) -> bool {
        self.read().is_some()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<OpenBook>> {
        self.book.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<OpenBook>> {
        self.book.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_book<T>(
        &self,
        f: impl FnOnce(&mut OpenBook) -> Result<T, RenderError>,
        error: impl FnOnce(String) -> RenderError,
    ) -> Result<T, RenderError> {
        match self.write().as_mut() {
            Some(book) => f(book),
            None => Err(error("no book is open".to_string())),
        }
    }
}

#[async_trait]
impl RenderingEngine for ClientViewer {
    async fn open(&self, content: &[u8]) -> Result<(), RenderError> {
        let content = content.to_vec();
        let book = tokio::task::spawn_blocking(move || OpenBook::parse(content))
            .await
            .map_err(|e| RenderError::Open(e.to_string()))??;
        tracing::debug!(
            "Viewer loaded {} sections, {} TOC entries",
            book.sections.len(),
            book.toc.len()
        );
        *self.write() = Some(book);
        Ok(())
    }

    async fn render(&self, viewport: Viewport) -> Result<(), RenderError> {
        self.with_book(
            |book| {
                book.viewport = Some(viewport);
                Ok(())
            },
            RenderError::Display,
        )
    }

    async fn display(&self, location: Option<&LocationToken>) -> Result<(), RenderError> {
        self.with_book(
            |book| {
                book.current = location.cloned();
                Ok(())
            },
            RenderError::Display,
        )
    }

    async fn display_href(&self, href: &str) -> Result<(), RenderError> {
        self.with_book(
            |book| {
                if !book.hrefs.contains(href) {
                    return Err(RenderError::Display(format!("unknown href: {}", href)));
                }
                book.target_href = Some(href.to_string());
                Ok(())
            },
            RenderError::Display,
        )
    }

    fn current_location(&self) -> Option<LocationToken> {
        self.read().as_ref().and_then(|b| b.current.clone())
    }

    async fn table_of_contents(&self) -> Result<Vec<TocEntry>, RenderError> {
        self.with_book(|book| Ok(book.toc.clone()), RenderError::Toc)
    }

    async fn generate_locations(&self, chars_per_location: usize) -> Result<usize, RenderError> {
        if chars_per_location == 0 {
            return Err(RenderError::Locations(
                "chars per location must be positive".to_string(),
            ));
        }
        self.with_book(
            |book| {
                let count = book.total_chars().div_ceil(chars_per_location).max(1);
                book.locations = Some(count);
                Ok(count)
            },
            RenderError::Locations,
        )
    }

    fn percentage(&self, location: &LocationToken) -> Option<f32> {
        let guard = self.read();
        let book = guard.as_ref()?;
        book.locations?;

        let index = cfi_spine_index(location)?;
        let total = book.total_chars();
        if index >= book.sections.len() || total == 0 {
            return None;
        }
        let before: usize = book.sections[..index].iter().sum();
        Some((before as f32 / total as f32).clamp(0.0, 1.0))
    }

    async fn close(&self) {
        if self.write().take().is_some() {
            tracing::debug!("Viewer closed");
        }
    }
}
