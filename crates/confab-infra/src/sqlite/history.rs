//! SQLite history store implementation.
//!
//! Implements `HistoryStore` from `confab-core` using sqlx with split
//! read/write pools. Thread order is the autoincrement row id, and the
//! `(session_id, persona, model, turn_id, role)` unique index makes
//! retried appends a no-op.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use confab_core::history::store::HistoryStore;
use confab_types::conversation::{
    AppendOutcome, ConversationKey, ConversationSummary, Message, Role,
};
use confab_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `HistoryStore`.
pub struct SqliteHistoryStore {
    pool: DatabasePool,
}

impl SqliteHistoryStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MessageRow {
    role: String,
    content: String,
    turn_id: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            turn_id: row.try_get("turn_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let turn_id = Uuid::parse_str(&self.turn_id)
            .map_err(|e| RepositoryError::Query(format!("invalid turn_id: {e}")))?;

        Ok(Message {
            role,
            content: self.content,
            turn_id,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct SummaryRow {
    session_id: String,
    persona: String,
    model: String,
    message_count: i64,
    started_at: String,
    last_activity_at: String,
}

impl SummaryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            persona: row.try_get("persona")?,
            model: row.try_get("model")?,
            message_count: row.try_get("message_count")?,
            started_at: row.try_get("started_at")?,
            last_activity_at: row.try_get("last_activity_at")?,
        })
    }

    fn into_summary(self) -> Result<ConversationSummary, RepositoryError> {
        let key = ConversationKey::resolve(self.session_id, self.persona, self.model);
        Ok(ConversationSummary {
            display_name: key.display_name(),
            key,
            message_count: self.message_count as u32,
            started_at: parse_datetime(&self.started_at)?,
            last_activity_at: parse_datetime(&self.last_activity_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Connection-level failures map to `Connection`, everything else to `Query`.
fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            RepositoryError::Connection(err.to_string())
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// HistoryStore implementation
// ---------------------------------------------------------------------------

impl HistoryStore for SqliteHistoryStore {
    async fn fetch(&self, key: &ConversationKey) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT role, content, turn_id, created_at FROM chat_messages
               WHERE session_id = ? AND persona = ? AND model = ?
               ORDER BY id ASC"#,
        )
        .bind(&key.session_id)
        .bind(&key.persona)
        .bind(&key.model)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }

        Ok(messages)
    }

    async fn append(
        &self,
        key: &ConversationKey,
        message: &Message,
    ) -> Result<AppendOutcome, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO chat_messages (session_id, persona, model, turn_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (session_id, persona, model, turn_id, role) DO NOTHING"#,
        )
        .bind(&key.session_id)
        .bind(&key.persona)
        .bind(&key.model)
        .bind(message.turn_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                conversation = %key,
                turn_id = %message.turn_id,
                role = %message.role,
                "Message already stored, skipping append"
            );
            return Ok(AppendOutcome::AlreadyPresent);
        }

        Ok(AppendOutcome::Appended)
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"WITH threads AS (
                   SELECT session_id, persona, model,
                          COUNT(*) AS message_count, MIN(id) AS first_id, MAX(id) AS last_id
                   FROM chat_messages
                   GROUP BY session_id, persona, model
               )
               SELECT t.session_id, t.persona, t.model, t.message_count,
                      f.created_at AS started_at, l.created_at AS last_activity_at
               FROM threads t
               JOIN chat_messages f ON f.id = t.first_id
               JOIN chat_messages l ON l.id = t.last_id
               ORDER BY t.last_id DESC"#,
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let summary_row =
                SummaryRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            summaries.push(summary_row.into_summary()?);
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "llama-3.3-70b-versatile";

    async fn test_pool(dir: &tempfile::TempDir) -> DatabasePool {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("history.db").display());
        DatabasePool::new(&url).await.unwrap()
    }

    fn key(session: &str, persona: &str) -> ConversationKey {
        ConversationKey::resolve(session, persona, MODEL)
    }

    #[tokio::test]
    async fn test_fetch_unknown_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(test_pool(&dir).await);
        assert!(store.fetch(&key("nobody", "Iron Man")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_and_fetch_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(test_pool(&dir).await);
        let k = key("abc123", "Iron Man");

        let t1 = Uuid::now_v7();
        let t2 = Uuid::now_v7();
        store.append(&k, &Message::human(t1, "Who are you?")).await.unwrap();
        store.append(&k, &Message::ai(t1, "I am Iron Man.")).await.unwrap();
        store.append(&k, &Message::human(t2, "And your suit?")).await.unwrap();
        store.append(&k, &Message::ai(t2, "Mark 85.")).await.unwrap();

        let thread = store.fetch(&k).await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Who are you?", "I am Iron Man.", "And your suit?", "Mark 85."]
        );
        assert_eq!(thread[0].role, Role::Human);
        assert_eq!(thread[1].role, Role::Ai);
        assert_eq!(thread[1].turn_id, t1);
    }

    #[tokio::test]
    async fn test_append_is_idempotent_per_turn_and_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(test_pool(&dir).await);
        let k = key("abc123", "Iron Man");
        let turn = Uuid::now_v7();

        let first = store.append(&k, &Message::human(turn, "hi")).await.unwrap();
        let again = store.append(&k, &Message::human(turn, "hi")).await.unwrap();
        assert_eq!(first, AppendOutcome::Appended);
        assert_eq!(again, AppendOutcome::AlreadyPresent);
        assert_eq!(store.fetch(&k).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_key_fields_are_not_confused() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(test_pool(&dir).await);
        // Two triples that would collide under naive string concatenation.
        let a = ConversationKey::resolve("a_b", "c", MODEL);
        let b = ConversationKey::resolve("a", "b_c", MODEL);

        store.append(&a, &Message::human(Uuid::now_v7(), "for a")).await.unwrap();

        assert_eq!(store.fetch(&a).await.unwrap().len(), 1);
        assert!(store.fetch(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let k = key("abc123", "Marie Curie");
        let turn = Uuid::now_v7();
        {
            let store = SqliteHistoryStore::new(test_pool(&dir).await);
            store.append(&k, &Message::human(turn, "Radium?")).await.unwrap();
            store.append(&k, &Message::ai(turn, "Yes, radium.")).await.unwrap();
        }

        let reopened = SqliteHistoryStore::new(test_pool(&dir).await);
        let thread = reopened.fetch(&k).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[1].content, "Yes, radium.");
    }

    #[tokio::test]
    async fn test_list_conversations_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(test_pool(&dir).await);
        let iron = key("abcdefgh-1111", "Iron Man");
        let curie = key("abcdefgh-1111", "Marie Curie");

        let t1 = Uuid::now_v7();
        store.append(&iron, &Message::human(t1, "one")).await.unwrap();
        store.append(&iron, &Message::ai(t1, "two")).await.unwrap();
        store.append(&curie, &Message::human(Uuid::now_v7(), "three")).await.unwrap();

        let list = store.list_conversations().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].key, curie);
        assert_eq!(list[0].display_name, "Marie Curie (abcdefgh)");
        assert_eq!(list[0].message_count, 1);
        assert_eq!(list[1].key, iron);
        assert_eq!(list[1].message_count, 2);
        assert!(list[1].started_at <= list[1].last_activity_at);
    }

    #[test]
    fn test_map_sqlx_error() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepositoryError::Connection(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepositoryError::Query(_)
        ));
    }
}
