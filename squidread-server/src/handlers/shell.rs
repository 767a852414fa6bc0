//! Offline shell handlers and the catch-all request path through the shell

use super::ApiError;
use crate::state::{AppState, ServerEvent};
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use squidread_core::shell::{
    FetchOutcome, RegisterOutcome, ResponseSource, ShellRequest, ShellStatus,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Response header naming where a shell-handled response came from
pub const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-squidread-source");

/// Register the configured manifest and announce a successful activation
pub async fn register_shell(state: &AppState) -> Option<RegisterOutcome> {
    match state.shell.register(state.manifest.clone()).await {
        Ok(outcome) => {
            match &outcome {
                RegisterOutcome::Activated(report) => {
                    tracing::info!(
                        "Shell v{} active ({} cached, {} failed)",
                        report.version,
                        report.install.cached.len(),
                        report.install.failed.len()
                    );
                    state.broadcast(ServerEvent::ShellActivated {
                        version: report.version,
                    });
                }
                RegisterOutcome::Unchanged { version } => {
                    tracing::debug!("Shell v{} unchanged", version)
                }
                RegisterOutcome::Failed { version, error } => {
                    tracing::error!("Shell v{} failed to activate: {}", version, error)
                }
            }
            Some(outcome)
        }
        Err(e) => {
            tracing::error!("Shell registration failed: {}", e);
            None
        }
    }
}

/// Current shell worker state
pub async fn shell_status(State(state): State<AppState>) -> Result<Json<ShellStatus>, ApiError> {
    state
        .shell
        .status()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub deleted: Vec<String>,
    pub reinstalling: bool,
}

/// Unregister the shell, drop every cache and reinstall in the background
pub async fn shell_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let deleted = state
        .shell
        .refresh()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let background = state.clone();
    tokio::spawn(async move {
        register_shell(&background).await;
    });

    Ok(Json(RefreshResponse {
        deleted,
        reinstalling: true,
    }))
}

/// Everything outside the API goes through the shell first
///
/// Pass-through requests are served straight from the shell directory.
pub async fn shell_fallback(State(state): State<AppState>, request: Request) -> Response {
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let shell_request = ShellRequest::new(request.method().clone(), url);

    match state.shell.fetch(shell_request).await {
        FetchOutcome::Respond { response, source } => {
            let mut out = (response.status, response.body).into_response();
            if let Some(content_type) = response
                .content_type
                .and_then(|ct| HeaderValue::from_str(&ct).ok())
            {
                out.headers_mut().insert(header::CONTENT_TYPE, content_type);
            }
            out.headers_mut().insert(
                SOURCE_HEADER,
                HeaderValue::from_static(source_name(source)),
            );
            out
        }
        FetchOutcome::Passthrough => match ServeDir::new(&state.shell_dir).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        },
    }
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Cache => "cache",
        ResponseSource::Network => "network",
        ResponseSource::Offline => "offline",
    }
}
