//! HTTP front end: a thin axum layer over [`QuestionService`].

use crate::{config::Config, generation::QuestionService};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

pub mod error;
pub mod handlers;
pub mod types;

/// Shared by every handler. Requests that touch the document session are
/// serialized through `questions`.
pub struct AppState {
    pub config: Arc<Config>,
    pub questions: Mutex<QuestionService>,
}

impl AppState {
    pub fn new(config: Arc<Config>, questions: QuestionService) -> Self {
        Self {
            config,
            questions: Mutex::new(questions),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    Router::new()
        .route("/health", get(handlers::health))
        .route("/generate", post(handlers::generate))
        .route("/upload", post(handlers::upload))
        .route("/documents", get(handlers::documents))
        .route("/stats", get(handlers::stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!(
        "Question generation server listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    log::info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    log::info!("Shutdown signal received");
}
