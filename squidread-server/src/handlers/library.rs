//! Library management handlers

use super::{library_error, parse_id, reader_error, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use squidread_core::library::{BookSummary, ImportOutcome, EPUB_MIME_TYPE};

/// List response
#[derive(Debug, Serialize)]
pub struct ListBooksResponse {
    /// Most recently used first
    pub books: Vec<BookSummary>,
    pub total: usize,
}

/// List all books
pub async fn list_books(
    State(state): State<AppState>,
) -> Result<Json<ListBooksResponse>, ApiError> {
    let records = state
        .reader
        .library()
        .list()
        .await
        .map_err(library_error)?;
    let books: Vec<BookSummary> = records.iter().map(BookSummary::from).collect();

    Ok(Json(ListBooksResponse {
        total: books.len(),
        books,
    }))
}

/// Get a single book's summary
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookSummary>, ApiError> {
    let id = parse_id(&id)?;
    let record = state
        .reader
        .library()
        .get(&id)
        .await
        .map_err(library_error)?;
    Ok(Json(BookSummary::from(&record)))
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub title: String,
    pub already_present: bool,
    pub message: String,
}

/// Upload a book, import it and open it
///
/// `201 Created` for a new book, `200 OK` when the content was already in the
/// library.
pub async fn upload_book(
    State(state): State<AppState>,
    mut multipart: axum_extra::extract::Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mime_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let outcome = state
            .reader
            .import_file(&filename, mime_type.as_deref(), data.to_vec())
            .await
            .map_err(reader_error)?;

        let (status, message) = match &outcome {
            ImportOutcome::Added(record) => (
                StatusCode::CREATED,
                format!("Added to library: {}", record.name),
            ),
            ImportOutcome::AlreadyPresent(_) => {
                (StatusCode::OK, "Book already in library".to_string())
            }
        };
        let record = outcome.record();
        return Ok((
            status,
            Json(UploadResponse {
                id: record.id.to_string(),
                title: record.title.clone(),
                already_present: !outcome.is_new(),
                message,
            }),
        ));
    }

    Err((StatusCode::BAD_REQUEST, "No file provided".to_string()))
}

/// Delete a book
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.reader.delete(&id).await.map_err(reader_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sanitize a filename for Content-Disposition header
fn sanitize_filename(name: &str, max_len: usize) -> String {
    name.chars()
        .take(max_len)
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_' || *c == '.')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Download the stored EPUB bytes
pub async fn book_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state
        .reader
        .library()
        .get(&id)
        .await
        .map_err(library_error)?;

    let mut filename = sanitize_filename(&record.name, 80);
    if filename.is_empty() {
        filename = format!("{}.epub", record.id);
    }

    Ok((
        [
            (header::CONTENT_TYPE, EPUB_MIME_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        record.content,
    )
        .into_response())
}

/// Serve the embedded cover image
pub async fn book_cover(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state
        .reader
        .library()
        .get(&id)
        .await
        .map_err(library_error)?;

    let (mime_type, data) = record
        .cover_image
        .as_ref()
        .and_then(|cover| cover.decode())
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Book has no cover".to_string()))?;

    Ok(([(header::CONTENT_TYPE, mime_type)], data).into_response())
}
