//! Reading session handlers

use super::{parse_id, reader_error, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use squidread_core::error::ReaderError;
use squidread_core::reading::{BestEffort, SessionInfo, Trigger};

/// Open a book and return where to resume
pub async fn open_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let id = parse_id(&id)?;
    let info = state.reader.open(&id).await.map_err(reader_error)?;
    Ok(Json(info))
}

/// The open session, or `null`
pub async fn get_session(State(state): State<AppState>) -> Json<Option<SessionInfo>> {
    Json(state.reader.session().await)
}

/// Lifecycle events reported by the client viewer
///
/// Always answers `200`; the body says whether the position was saved.
pub async fn session_event(
    State(state): State<AppState>,
    Json(trigger): Json<Trigger>,
) -> Json<BestEffort> {
    if let Trigger::Relocated { location } = &trigger {
        state.viewer.settle(location.clone());
    }
    Json(state.reader.handle(trigger).await)
}

/// Close response
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub closed: bool,
    /// Result of the final position flush
    pub flushed: Option<BestEffort>,
}

/// Flush the position and close the open book
pub async fn close_session(State(state): State<AppState>) -> Json<CloseResponse> {
    let flushed = state.reader.close().await;
    Json(CloseResponse {
        closed: flushed.is_some(),
        flushed,
    })
}

/// Navigation request
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub href: String,
}

/// Navigation response
#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub navigated: bool,
    /// The href the client should display
    pub target_href: Option<String>,
}

/// Jump to a table-of-contents entry
pub async fn navigate_session(
    State(state): State<AppState>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, ApiError> {
    if state.reader.session().await.is_none() {
        return Err(reader_error(ReaderError::NoSession));
    }
    let navigated = state.reader.go_to(&request.href).await;
    Ok(Json(NavigateResponse {
        navigated,
        target_href: state.viewer.target_href(),
    }))
}
