//! GET /health — provider probes and record store counters.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use file_store::RecordStore;
use tracing::warn;

use crate::{
    core::app_state::AppState,
    routes::health::health_response::{HealthResponse, StoreHealth},
};

/// Always answers; 503 when any probe failed.
pub async fn health_route(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let providers = state.llm.health_all().await;

    let store = match state.catalog.store().stats().await {
        Ok(stats) => StoreHealth {
            ok: true,
            stats: Some(stats),
            message: None,
        },
        Err(err) => {
            warn!(error = %err, "record store health check failed");
            StoreHealth {
                ok: false,
                stats: None,
                message: Some(err.to_string()),
            }
        }
    };

    let healthy = store.ok && providers.iter().all(|p| p.ok);
    let (code, status) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            providers,
            store,
        }),
    )
}
