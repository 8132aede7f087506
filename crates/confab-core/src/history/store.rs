//! HistoryStore trait definition.

use confab_types::conversation::{AppendOutcome, ConversationKey, ConversationSummary, Message};
use confab_types::error::RepositoryError;

/// Append-only message log keyed by [`ConversationKey`].
///
/// Implementations must keep messages for one key in append order, must
/// return an empty thread for a key they have never seen, and must treat
/// a second append with the same `(key, turn_id, role)` as a no-op.
pub trait HistoryStore: Send + Sync {
    /// Return the full thread for `key`, oldest first.
    fn fetch(
        &self,
        key: &ConversationKey,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Append `message` to the end of the thread for `key`.
    fn append(
        &self,
        key: &ConversationKey,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<AppendOutcome, RepositoryError>> + Send;

    /// List every known conversation, most recent activity first.
    fn list_conversations(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, RepositoryError>> + Send;
}
