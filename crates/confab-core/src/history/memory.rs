//! Process-local `HistoryStore` backed by `DashMap`.
//!
//! Used by tests and by `--ephemeral` CLI runs. Threads vanish when the
//! process exits. Guards are never held across an await.

use dashmap::DashMap;

use confab_types::conversation::{AppendOutcome, ConversationKey, ConversationSummary, Message};
use confab_types::error::RepositoryError;

use super::store::HistoryStore;

/// In-memory history store.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    threads: DashMap<ConversationKey, Vec<Message>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    async fn fetch(&self, key: &ConversationKey) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .threads
            .get(key)
            .map(|thread| thread.clone())
            .unwrap_or_default())
    }

    async fn append(
        &self,
        key: &ConversationKey,
        message: &Message,
    ) -> Result<AppendOutcome, RepositoryError> {
        let mut thread = self.threads.entry(key.clone()).or_default();
        let duplicate = thread
            .iter()
            .any(|m| m.turn_id == message.turn_id && m.role == message.role);
        if duplicate {
            return Ok(AppendOutcome::AlreadyPresent);
        }
        thread.push(message.clone());
        Ok(AppendOutcome::Appended)
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let mut summaries: Vec<ConversationSummary> = self
            .threads
            .iter()
            .filter_map(|entry| {
                let thread = entry.value();
                let first = thread.first()?;
                let last = thread.last()?;
                Some(ConversationSummary {
                    key: entry.key().clone(),
                    display_name: entry.key().display_name(),
                    message_count: thread.len() as u32,
                    started_at: first.created_at,
                    last_activity_at: last.created_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(summaries)
    }
}
