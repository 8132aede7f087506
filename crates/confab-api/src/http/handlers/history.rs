//! Conversation history HTTP handlers.
//!
//! Endpoints:
//! - GET /api/v1/history?session_id&persona&model        - Full thread
//! - GET /api/v1/history/export?session_id&persona&model - Plain-text transcript
//! - GET /api/v1/conversations                           - Past conversations

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use confab_types::conversation::{ConversationKey, ConversationSummary, Message};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters identifying one conversation.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub session_id: String,
    pub persona: String,
    pub model: String,
}

impl KeyQuery {
    fn key(self) -> ConversationKey {
        ConversationKey::resolve(self.session_id, self.persona, self.model)
    }
}

/// Response body for a thread lookup.
#[derive(Debug, Serialize)]
pub struct HistoryBody {
    pub key: ConversationKey,
    pub messages: Vec<Message>,
}

/// GET /api/v1/history - Full thread for a conversation, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<ApiResponse<HistoryBody>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let key = query.key();
    let messages = state.orchestrator.history(&key).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(HistoryBody { key, messages }, request_id, elapsed)
        .with_link("export", "/api/v1/history/export"))
}

/// GET /api/v1/history/export - Download the transcript as text.
pub async fn export_history(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Response, AppError> {
    let key = query.key();
    let transcript = state.orchestrator.export(&key).await?;

    let disposition = format!("attachment; filename=\"{}\"", transcript_filename(&key));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        transcript,
    )
        .into_response())
}

/// GET /api/v1/conversations - Stored conversations, most recent first.
pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<ConversationSummary>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversations = state.orchestrator.conversations().await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(conversations, request_id, elapsed)
        .with_link("self", "/api/v1/conversations"))
}

/// Header-safe download name, e.g. `Iron_Man_abc12345.txt`.
pub(crate) fn transcript_filename(key: &ConversationKey) -> String {
    let short: String = key.session_id.chars().take(8).collect();
    let stem: String = format!("{}_{short}", key.persona)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_filename_is_header_safe() {
        let key = ConversationKey::resolve("abc12345-6789", "J.K. Rowling", "m");
        assert_eq!(transcript_filename(&key), "J_K__Rowling_abc12345.txt");
    }
}
