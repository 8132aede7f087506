//! Conversation identity and message types for Confab.
//!
//! A conversation thread is identified by the triple
//! `(session_id, persona, model)`. Switching any one of the three starts a
//! different thread. Threads are append-only sequences of [`Message`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Composite identity of a conversation thread.
///
/// Equality is structural over all three fields. No normalization is
/// applied: `"Iron Man"` and `"iron man"` are different personas, and a
/// trailing space in a session id yields a different thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub session_id: String,
    pub persona: String,
    pub model: String,
}

impl ConversationKey {
    /// Build the key for a `(session, persona, model)` triple.
    pub fn resolve(
        session_id: impl Into<String>,
        persona: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            persona: persona.into(),
            model: model.into(),
        }
    }

    /// Short label used in conversation listings, e.g. `Iron Man (abc12345)`.
    pub fn display_name(&self) -> String {
        let short: String = self.session_id.chars().take(8).collect();
        format!("{} ({short})", self.persona)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.session_id, self.persona, self.model)
    }
}

/// Author of a message in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Role::Human),
            "ai" => Ok(Role::Ai),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in a conversation thread.
///
/// Both messages of one exchange carry the same `turn_id`, which is what
/// makes appends idempotent when a caller retries a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub turn_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a human message for the given turn.
    pub fn human(turn_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            turn_id,
            created_at: Utc::now(),
        }
    }

    /// Create an ai message for the given turn.
    pub fn ai(turn_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            turn_id,
            created_at: Utc::now(),
        }
    }
}

/// Result of appending a message to a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was written at the end of the thread.
    Appended,
    /// A message with the same turn id and role already exists; nothing was written.
    AlreadyPresent,
}

/// One entry of the "past conversations" listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub key: ConversationKey,
    pub display_name: String,
    pub message_count: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}
