//! Chat turn HTTP handler.
//!
//! Endpoints:
//! - POST /api/v1/chat - Run one conversational turn

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use confab_core::chat::session::{TurnReply, TurnRequest};
use confab_types::config::ChatConfig;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Reject models outside the configured catalog.
pub(crate) fn ensure_known_model(config: &ChatConfig, model: &str) -> Result<(), AppError> {
    if config.is_known_model(model) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Unknown model '{model}'. Available: {}",
            config.models.join(", ")
        )))
    }
}

/// POST /api/v1/chat - Send a message and receive the persona's reply.
///
/// Pass a previous `turn_id` to retry a turn without duplicating it.
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<ApiResponse<TurnReply>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    ensure_known_model(&state.config, &request.model)?;

    let reply = state.orchestrator.respond(&request).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    tracing::debug!(
        request_id = %request_id,
        conversation = %request.key(),
        replayed = reply.replayed,
        elapsed_ms = elapsed,
        "Chat turn served"
    );

    Ok(ApiResponse::success(reply, request_id, elapsed)
        .with_link("self", "/api/v1/chat")
        .with_link("history", "/api/v1/history"))
}
