//! POST /chat — answers the last message with file context.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    routes::chat::chat_request::{ChatRequest, ChatResponse},
};

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/chat \
///   -H 'content-type: application/json' \
///   -d '{"messages":[{"role":"user","content":"Which region sold the most?"}]}'
/// ```
#[instrument(name = "chat_route", skip_all)]
pub async fn chat_route(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let Json(body) = body?;
    let reply = state.chat.respond(&body.messages).await?;

    info!(
        context_files = reply.context_files,
        total_tokens = reply.total_tokens,
        "chat reply sent"
    );
    Ok(Json(ChatResponse {
        response: reply.response,
    }))
}
