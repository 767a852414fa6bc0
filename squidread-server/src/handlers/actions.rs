//! Library actions addressed by identifier

use super::{reader_error, ApiError};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use squidread_core::reading::{Action, ActionOutcome, SessionInfo};

/// `{"action": "open" | "delete", "id": "<book id>"}`
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionResponse {
    Opened { session: SessionInfo },
    AlreadyOpen { session: SessionInfo },
    Deleted { cleared_session: bool },
}

impl From<ActionOutcome> for ActionResponse {
    fn from(outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Opened(session) => ActionResponse::Opened { session },
            ActionOutcome::AlreadyOpen(session) => ActionResponse::AlreadyOpen { session },
            ActionOutcome::Deleted { cleared_session } => {
                ActionResponse::Deleted { cleared_session }
            }
        }
    }
}

/// Dispatch an action
pub async fn dispatch_action(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let action = Action::parse(&request.action, &request.id).map_err(reader_error)?;
    let outcome = state
        .reader
        .dispatch(action)
        .await
        .map_err(reader_error)?;
    Ok(Json(outcome.into()))
}
