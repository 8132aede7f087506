//! Caller-owned chat session state and turn request/reply shapes.
//!
//! A `ChatSession` is what a front-end keeps between turns: which session,
//! persona and model are selected, plus the custom prompt. It is passed
//! explicitly into every turn; the orchestrator holds no per-user state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use confab_types::conversation::ConversationKey;
use confab_types::persona::CUSTOM_PERSONA;

/// Input for one conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub session_id: String,
    pub persona: String,
    pub model: String,
    pub user_text: String,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Reuse a previous turn id to retry that turn without duplicating it.
    #[serde(default)]
    pub turn_id: Option<Uuid>,
}

impl TurnRequest {
    pub fn key(&self) -> ConversationKey {
        ConversationKey::resolve(&self.session_id, &self.persona, &self.model)
    }
}

/// Result of a successful turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub reply_text: String,
    pub turn_id: Uuid,
    pub key: ConversationKey,
    /// True when the reply was already stored and no generation call was made.
    pub replayed: bool,
}

/// Front-end session selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    pub persona: String,
    pub model: String,
    pub custom_prompt: Option<String>,
}

impl ChatSession {
    /// Start a fresh session on `model` with the `Custom` persona.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            persona: CUSTOM_PERSONA.to_string(),
            model: model.into(),
            custom_prompt: None,
        }
    }

    /// Resume an existing thread.
    pub fn resume(key: ConversationKey) -> Self {
        Self {
            session_id: key.session_id,
            persona: key.persona,
            model: key.model,
            custom_prompt: None,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    /// Begin a new session id, keeping persona, model and prompt selection.
    pub fn restart(&mut self) {
        self.session_id = Uuid::new_v4().to_string();
    }

    pub fn key(&self) -> ConversationKey {
        ConversationKey::resolve(&self.session_id, &self.persona, &self.model)
    }

    pub fn display_name(&self) -> String {
        self.key().display_name()
    }

    /// Build the request for sending `user_text` in this session.
    pub fn turn(&self, user_text: impl Into<String>) -> TurnRequest {
        TurnRequest {
            session_id: self.session_id.clone(),
            persona: self.persona.clone(),
            model: self.model.clone(),
            user_text: user_text.into(),
            custom_prompt: self.custom_prompt.clone(),
            turn_id: None,
        }
    }
}
