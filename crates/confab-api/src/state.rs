//! Application state wiring the orchestrator, store, and provider together.
//!
//! `ResponseOrchestrator` is generic over the history store; AppState pins
//! it to [`ChatStore`], which is either the SQLite store or, for
//! `--ephemeral` runs, the in-memory one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use confab_core::chat::orchestrator::{GenerationSettings, ResponseOrchestrator};
use confab_core::history::memory::InMemoryHistoryStore;
use confab_core::history::store::HistoryStore;
use confab_core::llm::box_provider::BoxLlmProvider;
use confab_infra::config::{load_config, resolve_api_key, resolve_data_dir};
use confab_infra::llm::create_provider;
use confab_infra::sqlite::history::SqliteHistoryStore;
use confab_infra::sqlite::pool::{DatabasePool, database_url};
use confab_types::config::ChatConfig;
use confab_types::conversation::{AppendOutcome, ConversationKey, ConversationSummary, Message};
use confab_types::error::RepositoryError;

/// History store selected at startup.
pub enum ChatStore {
    Sqlite(SqliteHistoryStore),
    Memory(InMemoryHistoryStore),
}

impl ChatStore {
    /// Open the store for `data_dir`, or an empty in-memory store.
    pub async fn open(data_dir: &Path, ephemeral: bool) -> anyhow::Result<Self> {
        if ephemeral {
            tracing::info!("Using in-memory history; nothing will be persisted");
            return Ok(ChatStore::Memory(InMemoryHistoryStore::new()));
        }

        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;

        let url = database_url(data_dir);
        let pool = DatabasePool::new(&url)
            .await
            .with_context(|| format!("cannot open history database {url}"))?;
        Ok(ChatStore::Sqlite(SqliteHistoryStore::new(pool)))
    }
}

impl HistoryStore for ChatStore {
    async fn fetch(&self, key: &ConversationKey) -> Result<Vec<Message>, RepositoryError> {
        match self {
            ChatStore::Sqlite(store) => store.fetch(key).await,
            ChatStore::Memory(store) => store.fetch(key).await,
        }
    }

    async fn append(
        &self,
        key: &ConversationKey,
        message: &Message,
    ) -> Result<AppendOutcome, RepositoryError> {
        match self {
            ChatStore::Sqlite(store) => store.append(key, message).await,
            ChatStore::Memory(store) => store.append(key, message).await,
        }
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
        match self {
            ChatStore::Sqlite(store) => store.list_conversations().await,
            ChatStore::Memory(store) => store.list_conversations().await,
        }
    }
}

pub type ConcreteOrchestrator = ResponseOrchestrator<ChatStore>;

/// Shared application state.
///
/// Used by both the chat REPL and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: Arc<ChatConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, open the store,
    /// and configure the generation provider.
    pub async fn init(ephemeral: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;
        let store = ChatStore::open(&data_dir, ephemeral).await?;

        let api_key = resolve_api_key(&config.provider);
        let provider = create_provider(&config.provider, api_key).with_context(|| {
            format!(
                "cannot configure provider '{}' (is {} set?)",
                config.provider.name, config.provider.api_key_env
            )
        })?;

        tracing::info!(
            provider = provider.name(),
            default_model = %config.default_model,
            data_dir = %data_dir.display(),
            "Application state initialized"
        );

        Ok(Self::from_parts(store, provider, config, data_dir))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        store: ChatStore,
        provider: BoxLlmProvider,
        config: ChatConfig,
        data_dir: PathBuf,
    ) -> Self {
        let settings = GenerationSettings::from_config(&config);
        Self {
            orchestrator: Arc::new(ResponseOrchestrator::new(store, provider, settings)),
            config: Arc::new(config),
            data_dir,
        }
    }
}
