//! API routes

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Origins allowed when none are configured
const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Largest accepted EPUB upload (axum's default is 2 MB)
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// CORS policy from a comma-separated origin list, `*`, or the dev defaults
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let allow_origin = match origins {
        Some("*") => AllowOrigin::from(Any),
        Some(origins) => AllowOrigin::list(
            origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok()),
        ),
        None => AllowOrigin::list(DEV_ORIGINS.iter().copied().map(HeaderValue::from_static)),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState, cors_origins: Option<&str>) -> Router {
    let api_routes = Router::new()
        // Library endpoints
        .route(
            "/library",
            get(handlers::list_books)
                .post(handlers::upload_book)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/library/:id",
            get(handlers::get_book).delete(handlers::delete_book),
        )
        .route("/library/:id/content", get(handlers::book_content))
        .route("/library/:id/cover", get(handlers::book_cover))
        // Reading session
        .route(
            "/session",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route("/session/events", post(handlers::session_event))
        .route("/session/navigate", post(handlers::navigate_session))
        .route("/session/:id", post(handlers::open_session))
        .route("/actions", post(handlers::dispatch_action))
        // Offline shell
        .route("/shell/status", get(handlers::shell_status))
        .route("/shell/refresh", post(handlers::shell_refresh))
        // SSE endpoint
        .route("/sync", get(handlers::sync_events));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        .fallback(handlers::shell_fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
