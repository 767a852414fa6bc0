//! Application state

use crate::config::ServerConfig;
use crate::origin::ShellOrigin;
use crate::viewer::ClientViewer;
use anyhow::{Context, Result};
use serde::Serialize;
use squidread_core::library::{Library, LibraryEvent};
use squidread_core::reading::{LastOpenedPointer, Notice, Reader};
use squidread_core::shell::{PersistentCacheStorage, ShellHandle, ShellManifest};
use squidread_core::storage::{LocalStorage, StorageProvider};
use squidread_core::{BookStore, EpubExtractor};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reader controller; owns the library and the open session
    pub reader: Arc<Reader>,

    /// Server half of the client-rendered viewer
    pub viewer: Arc<ClientViewer>,

    /// Offline shell runtime
    pub shell: ShellHandle,

    /// Manifest re-registered at startup and after a manual refresh
    pub manifest: ShellManifest,

    /// Directory pass-through requests are served from
    pub shell_dir: PathBuf,

    /// Channel for SSE events
    pub event_tx: broadcast::Sender<ServerEvent>,
}

/// Server-sent events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A new book was added to the library
    BookImported { id: String, title: String },

    /// An import matched a book already in the library
    BookAlreadyPresent { id: String },

    /// A book was opened
    BookOpened { id: String },

    /// A stored record changed
    BookUpdated { id: String },

    /// A book was removed
    BookDeleted { id: String },

    /// Short user-facing message
    Notice { message: String },

    /// A shell version took over
    ShellActivated { version: u32 },
}

impl ServerEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::BookImported { .. } => "book_imported",
            ServerEvent::BookAlreadyPresent { .. } => "book_already_present",
            ServerEvent::BookOpened { .. } => "book_opened",
            ServerEvent::BookUpdated { .. } => "book_updated",
            ServerEvent::BookDeleted { .. } => "book_deleted",
            ServerEvent::Notice { .. } => "notice",
            ServerEvent::ShellActivated { .. } => "shell_activated",
        }
    }
}

impl From<LibraryEvent> for ServerEvent {
    fn from(event: LibraryEvent) -> Self {
        match event {
            LibraryEvent::Imported { id, title } => ServerEvent::BookImported {
                id: id.to_string(),
                title,
            },
            LibraryEvent::AlreadyPresent { id } => ServerEvent::BookAlreadyPresent {
                id: id.to_string(),
            },
            LibraryEvent::Opened { id } => ServerEvent::BookOpened { id: id.to_string() },
            LibraryEvent::Updated { id } => ServerEvent::BookUpdated { id: id.to_string() },
            LibraryEvent::Deleted { id } => ServerEvent::BookDeleted { id: id.to_string() },
        }
    }
}

impl From<Notice> for ServerEvent {
    fn from(notice: Notice) -> Self {
        ServerEvent::Notice {
            message: notice.to_string(),
        }
    }
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create storage directory {}",
                    config.storage_path.display()
                )
            })?;

        let storage: Arc<dyn StorageProvider> = Arc::new(LocalStorage::new(&config.storage_path));
        let manifest = ShellManifest::default().with_version(config.shell_version);
        Ok(Self::with_storage(storage, config.shell_dir.clone(), manifest))
    }

    /// Assemble state over an existing storage provider
    ///
    /// Books, the last-opened pointer and shell caches all live in `storage`.
    pub fn with_storage(
        storage: Arc<dyn StorageProvider>,
        shell_dir: PathBuf,
        manifest: ShellManifest,
    ) -> Self {
        let library = Library::new(
            BookStore::new(storage.clone()),
            Arc::new(EpubExtractor::new()),
        );
        let viewer = Arc::new(ClientViewer::new());
        let reader = Arc::new(Reader::new(
            library,
            viewer.clone(),
            LastOpenedPointer::new(storage.clone()),
        ));

        let shell = ShellHandle::spawn(
            Arc::new(PersistentCacheStorage::new(storage)),
            Arc::new(ShellOrigin::new(&shell_dir)),
        );

        let (event_tx, _) = broadcast::channel(100);
        let state = Self {
            reader,
            viewer,
            shell,
            manifest,
            shell_dir,
            event_tx,
        };
        state.forward_events();
        state
    }

    /// Relay library events and reader notices onto the SSE channel
    fn forward_events(&self) {
        let library_events = BroadcastStream::new(self.reader.library().subscribe())
            .filter_map(|event| event.ok().map(ServerEvent::from));
        let notices = BroadcastStream::new(self.reader.notices())
            .filter_map(|notice| notice.ok().map(ServerEvent::from));

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let mut events = library_events.merge(notices);
            while let Some(event) = events.next().await {
                // Ignore errors (no subscribers)
                let _ = event_tx.send(event);
            }
        });
    }

    /// Subscribe to server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: ServerEvent) {
        // Ignore errors (no subscribers)
        let _ = self.event_tx.send(event);
    }
}
