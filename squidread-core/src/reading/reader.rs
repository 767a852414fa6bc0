//! The reader controller
//!
//! Holds the library, the rendering engine and at most one open
//! [`ReadingSession`]. User actions arrive either as direct method calls or
//! through [`Reader::dispatch`].

use super::engine::{RenderingEngine, Viewport, CHARS_PER_LOCATION};
use super::pointer::LastOpenedPointer;
use super::session::{ReadingSession, SessionInfo};
use super::tracker::{BestEffort, PositionTracker, Trigger};
use crate::error::{ImportError, LibraryError, ReaderError};
use crate::library::{is_epub_file, ImportOutcome, Library};
use crate::types::{strip_fragment, BookId};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Short-lived user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Added { name: String },
    AlreadyInLibrary,
    NotAnEpub,
    ReadFailed,
    OpenFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Added { name } => write!(f, "Added to library: {}", name),
            Notice::AlreadyInLibrary => f.write_str("Book already in library"),
            Notice::NotAnEpub => f.write_str("Drop an EPUB file"),
            Notice::ReadFailed => f.write_str("Failed to read file"),
            Notice::OpenFailed => f.write_str("Failed to open book"),
        }
    }
}

/// Library actions addressed by identifier, as sent by a UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open(BookId),
    Delete(BookId),
}

impl Action {
    /// Build an action from its identifier and target book id
    pub fn parse(action: &str, id: &str) -> Result<Self, ReaderError> {
        let id = BookId::parse(id).map_err(ReaderError::Library)?;
        match action {
            "open" => Ok(Action::Open(id)),
            "delete" => Ok(Action::Delete(id)),
            other => Err(ReaderError::UnknownAction(other.to_string())),
        }
    }
}

/// What a dispatched action did
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Opened(SessionInfo),
    /// The book was already the open one; nothing was reloaded
    AlreadyOpen(SessionInfo),
    Deleted { cleared_session: bool },
}

/// Clears the import flag when the import finishes, however it finishes
struct ImportGuard<'a>(&'a AtomicBool);

impl Drop for ImportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Controller for one reading surface
pub struct Reader {
    library: Library,
    engine: Arc<dyn RenderingEngine>,
    tracker: PositionTracker,
    pointer: LastOpenedPointer,
    viewport: Viewport,
    session: Mutex<Option<ReadingSession>>,
    importing: AtomicBool,
    notices: broadcast::Sender<Notice>,
}

impl Reader {
    pub fn new(
        library: Library,
        engine: Arc<dyn RenderingEngine>,
        pointer: LastOpenedPointer,
    ) -> Self {
        let (notices, _) = broadcast::channel(32);
        Self {
            tracker: PositionTracker::new(library.clone()),
            library,
            engine,
            pointer,
            viewport: Viewport::default(),
            session: Mutex::new(None),
            importing: AtomicBool::new(false),
            notices,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Subscribe to user-facing notices
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    /// Snapshot of the open session, if any
    pub async fn session(&self) -> Option<SessionInfo> {
        self.session.lock().await.as_ref().map(ReadingSession::info)
    }

    fn begin_import(&self) -> Result<ImportGuard<'_>, ImportError> {
        if self.importing.swap(true, Ordering::AcqRel) {
            tracing::debug!("Ignoring selection while processing");
            return Err(ImportError::Busy);
        }
        Ok(ImportGuard(&self.importing))
    }

    /// Import a file from disk and open it
    pub async fn import_path(&self, path: &Path) -> Result<ImportOutcome, ReaderError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if !is_epub_file(&name, None) {
            self.notify(Notice::NotAnEpub);
            return Err(ImportError::NotEpub(name).into());
        }

        let _guard = self.begin_import()?;
        tracing::info!("File selected: {}", path.display());
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("File handling failed: {}", e);
                self.notify(Notice::ReadFailed);
                return Err(ImportError::ReadFailed(e.to_string()).into());
            }
        };
        self.import_and_open(&name, content).await
    }

    /// Import already-read content and open it
    ///
    /// A second import while one is running is dropped with [`ImportError::Busy`].
    pub async fn import_file(
        &self,
        name: &str,
        mime_type: Option<&str>,
        content: Vec<u8>,
    ) -> Result<ImportOutcome, ReaderError> {
        if !is_epub_file(name, mime_type) {
            self.notify(Notice::NotAnEpub);
            return Err(ImportError::NotEpub(name.to_string()).into());
        }
        let _guard = self.begin_import()?;
        self.import_and_open(name, content).await
    }

    async fn import_and_open(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> Result<ImportOutcome, ReaderError> {
        let outcome = match self.library.import(name, content).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("File handling failed: {}", e);
                self.notify(Notice::ReadFailed);
                return Err(e.into());
            }
        };

        // The record is kept even if the engine cannot open it
        if let Err(e) = self.open(&outcome.record().id).await {
            tracing::error!("Imported book could not be opened: {}", e);
        }

        self.notify(match &outcome {
            ImportOutcome::Added(record) => Notice::Added {
                name: record.name.clone(),
            },
            ImportOutcome::AlreadyPresent(_) => Notice::AlreadyInLibrary,
        });
        Ok(outcome)
    }

    /// Open a book and resume at its last location
    ///
    /// If the engine cannot open the content, the previous session stays.
    /// Opens are serialized so the engine and the session always hold the
    /// same book.
    pub async fn open(&self, id: &BookId) -> Result<SessionInfo, ReaderError> {
        let mut guard = self.session.lock().await;
        let record = self.library.open(id).await?;

        if let Err(e) = self.engine.open(&record.content).await {
            tracing::error!("Failed to open book: {}", e);
            self.notify(Notice::OpenFailed);
            return Err(ReaderError::OpenFailed(e));
        }
        tracing::info!("Book opened successfully: {}", record.id);

        if let Err(e) = self.engine.render(self.viewport).await {
            tracing::warn!("Failed to render into viewport: {}", e);
        }
        if let Err(e) = self.engine.display(record.last_location.as_ref()).await {
            tracing::error!("Failed to display EPUB: {}", e);
        }

        let toc = self.engine.table_of_contents().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to load TOC: {}", e);
            Vec::new()
        });

        let mut session = ReadingSession::new(record, toc);
        match self.engine.generate_locations(CHARS_PER_LOCATION).await {
            Ok(count) => {
                tracing::debug!("Locations generated: {}", count);
                session.locations_ready = true;
                session.progress = session
                    .record
                    .last_location
                    .as_ref()
                    .and_then(|location| self.engine.percentage(location));
            }
            Err(e) => tracing::warn!("Location generation failed: {}", e),
        }

        self.pointer.remember(session.book_id()).await;
        let info = session.info();
        *guard = Some(session);
        Ok(info)
    }

    /// Reopen the last opened book, or the most recent one
    pub async fn resume(&self) -> Option<SessionInfo> {
        if let Some(id) = self.pointer.load().await {
            match self.open(&id).await {
                Ok(info) => return Some(info),
                Err(ReaderError::Library(LibraryError::NotFound(_))) => {
                    self.pointer.clear().await;
                }
                Err(e) => tracing::warn!("Failed to load last opened book: {}", e),
            }
        }

        match self.library.most_recent().await {
            Ok(Some(record)) => {
                tracing::info!("Loading most recent book: {}", record.id);
                self.open(&record.id).await.ok()
            }
            Ok(None) => {
                tracing::info!("No books in library");
                None
            }
            Err(e) => {
                tracing::warn!("Failed to list library: {}", e);
                None
            }
        }
    }

    /// Persist the position for a lifecycle trigger
    pub async fn handle(&self, trigger: Trigger) -> BestEffort {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return BestEffort::Skipped {
                reason: "no open book",
            };
        };

        let location = match trigger {
            Trigger::Relocated { location } => {
                tracing::debug!("Relocated: {}", location);
                if session.locations_ready {
                    session.progress = self.engine.percentage(&location);
                }
                Some(location)
            }
            Trigger::Hidden | Trigger::Terminating => self.engine.current_location(),
        };

        self.tracker.persist(session, location).await
    }

    /// Navigate to a table-of-contents href
    ///
    /// Falls back to the href without its fragment before giving up.
    pub async fn go_to(&self, href: &str) -> bool {
        if self.session.lock().await.is_none() {
            return false;
        }
        let Err(first) = self.engine.display_href(href).await else {
            return true;
        };

        let base = strip_fragment(href);
        if base != href && self.engine.display_href(base).await.is_ok() {
            return true;
        }
        tracing::warn!("Failed to navigate to TOC item {}: {}", href, first);
        false
    }

    /// Flush the position and tear the session down
    pub async fn close(&self) -> Option<BestEffort> {
        let mut guard = self.session.lock().await;
        let mut session = guard.take()?;
        let flushed = self
            .tracker
            .persist(&mut session, self.engine.current_location())
            .await;
        self.engine.close().await;
        tracing::info!("Cleared viewer");
        Some(flushed)
    }

    /// Delete a book, clearing the session if it was the open one
    pub async fn delete(&self, id: &BookId) -> Result<bool, ReaderError> {
        // Held across the delete so an in-flight position write cannot restore the record
        let mut guard = self.session.lock().await;
        self.library.delete(id).await?;

        let was_open = guard.as_ref().is_some_and(|s| s.book_id() == id);
        if was_open {
            *guard = None;
            self.engine.close().await;
            self.pointer.clear().await;
            tracing::info!("Cleared viewer");
        }
        Ok(was_open)
    }

    /// Run a library action
    pub async fn dispatch(&self, action: Action) -> Result<ActionOutcome, ReaderError> {
        tracing::debug!("Library action: {:?}", action);
        match action {
            Action::Open(id) => {
                let current = self
                    .session
                    .lock()
                    .await
                    .as_ref()
                    .filter(|s| s.book_id() == &id)
                    .map(ReadingSession::info);
                match current {
                    Some(info) => Ok(ActionOutcome::AlreadyOpen(info)),
                    None => self.open(&id).await.map(ActionOutcome::Opened),
                }
            }
            Action::Delete(id) => {
                let cleared_session = self.delete(&id).await?;
                Ok(ActionOutcome::Deleted { cleared_session })
            }
        }
    }
}
