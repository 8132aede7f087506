//! Session, persona, and model catalog HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions - Start a fresh session ("New Chat")
//! - GET  /api/v1/personas - Built-in personas plus Custom
//! - GET  /api/v1/models   - Selectable models

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use confab_core::chat::session::ChatSession;
use confab_types::persona::{PersonaInfo, persona_catalog};

use crate::http::error::AppError;
use crate::http::handlers::chat::ensure_known_model;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for POST /sessions.
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    /// Model for the new session; the configured default when omitted.
    #[serde(default)]
    pub model: Option<String>,
}

/// Model catalog response body.
#[derive(Debug, Serialize)]
pub struct ModelsBody {
    pub default_model: String,
    pub models: Vec<String>,
}

/// POST /api/v1/sessions - Generate a new session id.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<NewSessionRequest>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let model = request
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    ensure_known_model(&state.config, &model)?;

    let session = ChatSession::new(model);
    tracing::info!(session_id = %session.session_id, model = %session.model, "New session");

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(session, request_id, elapsed).with_link("chat", "/api/v1/chat"))
}

/// GET /api/v1/personas - Persona catalog.
pub async fn list_personas() -> ApiResponse<Vec<PersonaInfo>> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let catalog = persona_catalog();
    ApiResponse::success(catalog, request_id, start.elapsed().as_millis() as u64)
}

/// GET /api/v1/models - Model catalog.
pub async fn list_models(State(state): State<AppState>) -> ApiResponse<ModelsBody> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let body = ModelsBody {
        default_model: state.config.default_model.clone(),
        models: state.config.models.clone(),
    };
    ApiResponse::success(body, request_id, start.elapsed().as_millis() as u64)
}
