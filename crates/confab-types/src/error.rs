use thiserror::Error;
use uuid::Uuid;

use crate::llm::LlmError;

/// Errors returned by a chat turn.
///
/// Caller-input errors (`InvalidPersonaPrompt`, `InvalidSessionId`,
/// `EmptyMessage`) are raised before any store access. The turn conflicts
/// (`StaleTurn`, `TurnMismatch`) are raised after the thread is read and
/// before anything is written.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("persona '{persona}' requires a non-blank custom prompt")]
    InvalidPersonaPrompt { persona: String },

    #[error("session id must not be empty")]
    InvalidSessionId,

    #[error("message must not be empty")]
    EmptyMessage,

    /// A retried turn whose human message is no longer the last one in the thread.
    #[error("turn {turn_id} can no longer be retried: later messages exist")]
    StaleTurn { turn_id: Uuid },

    /// A `turn_id` reused with different text.
    #[error("turn {turn_id} was already sent with different text")]
    TurnMismatch { turn_id: Uuid },

    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("generation service error: {0}")]
    Generation(#[from] LlmError),
}

impl ChatError {
    /// True for errors caused by the caller's input rather than infrastructure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ChatError::InvalidPersonaPrompt { .. }
                | ChatError::InvalidSessionId
                | ChatError::EmptyMessage
                | ChatError::StaleTurn { .. }
                | ChatError::TurnMismatch { .. }
        )
    }
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        ChatError::StoreUnavailable(e.to_string())
    }
}

/// Errors from history store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::InvalidPersonaPrompt {
            persona: "Custom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "persona 'Custom' requires a non-blank custom prompt"
        );
    }

    #[test]
    fn test_repository_error_maps_to_store_unavailable() {
        let err: ChatError = RepositoryError::Connection("refused".to_string()).into();
        assert!(matches!(err, ChatError::StoreUnavailable(_)));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_llm_error_is_wrapped_unmodified() {
        let err: ChatError = LlmError::RateLimited {
            retry_after_ms: Some(500),
        }
        .into();
        match err {
            ChatError::Generation(LlmError::RateLimited { retry_after_ms }) => {
                assert_eq!(retry_after_ms, Some(500));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_caller_errors() {
        assert!(ChatError::EmptyMessage.is_caller_error());
        assert!(ChatError::InvalidSessionId.is_caller_error());
        assert!(
            ChatError::StaleTurn {
                turn_id: Uuid::nil()
            }
            .is_caller_error()
        );
        assert!(
            ChatError::TurnMismatch {
                turn_id: Uuid::nil()
            }
            .is_caller_error()
        );
    }
}
