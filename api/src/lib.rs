//! HTTP surface of the chat backend: `/chat`, `/files`, `/health`.

use std::sync::Arc;

pub mod core;
pub mod error_handler;
mod routes;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use file_store::reindex::spawn_worker;
use tokio::{signal, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use crate::core::app_state::{AppState, ServerConfig};
pub use crate::error_handler::{AppError, AppResult};

use crate::routes::{
    chat::chat_route::chat_route,
    files::files_route::{create_file, delete_file, get_file, list_files, update_file},
    health::health_route::health_route,
};

/// Route table. The body limit comes from `state.max_upload_bytes`.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/chat", post(chat_route))
        .route("/files", get(list_files).post(create_file))
        .route(
            "/files/{id}",
            get(get_file).put(update_file).delete(delete_file),
        )
        .route("/health", get(health_route))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the state, starts the re-index worker and serves until Ctrl+C or
/// SIGTERM. The worker is stopped after the server drains.
pub async fn start() -> Result<(), AppError> {
    let server = ServerConfig::from_env()?;
    let state = Arc::new(AppState::from_env(&server).await?);

    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = spawn_worker(state.catalog.clone(), state.reindex, stop_rx);

    let listener = tokio::net::TcpListener::bind(&server.address)
        .await
        .map_err(|source| AppError::Bind {
            addr: server.address.clone(),
            source,
        })?;
    info!(address = %server.address, "listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server);

    let _ = stop_tx.send(true);
    if let Err(err) = worker.await {
        error!(error = %err, "reindex worker ended abnormally");
    }
    info!("server stopped");
    served
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
