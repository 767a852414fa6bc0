//! Request handlers

mod actions;
mod library;
mod session;
mod shell;
mod sync;

pub use actions::*;
pub use library::*;
pub use session::*;
pub use shell::*;
pub use sync::*;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use squidread_core::error::{ImportError, LibraryError, ReaderError, StorageError};
use squidread_core::BookId;

/// Error half of every fallible handler
pub type ApiError = (StatusCode, String);

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Parse a path id, rejecting anything that is not a book id
pub(crate) fn parse_id(id: &str) -> Result<BookId, ApiError> {
    BookId::parse(id).map_err(library_error)
}

pub(crate) fn library_error(error: LibraryError) -> ApiError {
    let status = match &error {
        LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
        LibraryError::InvalidId(_) => StatusCode::BAD_REQUEST,
        LibraryError::Storage(StorageError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        LibraryError::Storage(_) => {
            tracing::error!("Library storage failure: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string())
}

pub(crate) fn reader_error(error: ReaderError) -> ApiError {
    match error {
        ReaderError::Library(e) => library_error(e),
        ReaderError::Import(ImportError::Busy) => {
            (StatusCode::CONFLICT, ImportError::Busy.to_string())
        }
        ReaderError::Import(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        e @ ReaderError::OpenFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        e @ ReaderError::NoSession => (StatusCode::CONFLICT, e.to_string()),
        e @ ReaderError::UnknownAction(_) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}
