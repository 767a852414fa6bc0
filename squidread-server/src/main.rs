//! Squidread Server - library, reading sessions and the offline shell over HTTP

use anyhow::{Context, Result};
use squidread_core::reading::Trigger;
use squidread_server::config::ServerConfig;
use squidread_server::{handlers, routes, state};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "squidread_server=debug,squidread_core=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Create application state
    let state = state::AppState::new(&config).await?;

    // Install the offline shell without holding up startup
    let shell_state = state.clone();
    tokio::spawn(async move {
        handlers::register_shell(&shell_state).await;
    });

    // Reopen where the reader left off
    match state.reader.resume().await {
        Some(session) => tracing::info!("Resumed {} ({})", session.title, session.id),
        None => tracing::info!("No book to resume"),
    }

    // Build router
    let app = routes::create_router(state.clone(), config.cors_origins.as_deref());

    // Start server
    tracing::info!("Starting server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Last chance to persist the reading position
    let flushed = state.reader.handle(Trigger::Terminating).await;
    tracing::info!("Final position flush: {:?}", flushed);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
