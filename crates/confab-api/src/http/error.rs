//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use confab_types::error::ChatError;
use confab_types::llm::LlmError;

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from a chat turn or history access.
    Chat(ChatError),
    /// Request failed validation before reaching the orchestrator.
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl AppError {
    /// Status code and machine-readable code for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Chat(ChatError::InvalidPersonaPrompt { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_PERSONA_PROMPT")
            }
            AppError::Chat(ChatError::InvalidSessionId) => {
                (StatusCode::BAD_REQUEST, "INVALID_SESSION_ID")
            }
            AppError::Chat(ChatError::EmptyMessage) => (StatusCode::BAD_REQUEST, "EMPTY_MESSAGE"),
            AppError::Chat(ChatError::StaleTurn { .. }) => (StatusCode::CONFLICT, "STALE_TURN"),
            AppError::Chat(ChatError::TurnMismatch { .. }) => {
                (StatusCode::CONFLICT, "TURN_MISMATCH")
            }
            AppError::Chat(ChatError::StoreUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            AppError::Chat(ChatError::Generation(LlmError::RateLimited { .. })) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
            }
            AppError::Chat(ChatError::Generation(LlmError::Timeout(_))) => {
                (StatusCode::GATEWAY_TIMEOUT, "GENERATION_TIMEOUT")
            }
            AppError::Chat(ChatError::Generation(_)) => {
                (StatusCode::BAD_GATEWAY, "GENERATION_ERROR")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Chat(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let message = self.message();

        if status.is_server_error() {
            tracing::warn!(code, %message, "Request failed");
        }

        let mut response = ApiResponse::error(code, &message, String::new()).into_response();
        *response.status_mut() = status;
        response
    }
}
