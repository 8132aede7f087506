//! Response orchestrator: one conversational turn end to end.
//!
//! Flow per turn:
//! 1. Resolve the system prompt from the persona (fails before any I/O)
//! 2. Resolve the conversation key and take its turn lock
//! 3. Fetch the full thread
//! 4. Append the human message, then call the generation service with
//!    `[system] + [thread]`
//! 5. Append the reply as an ai message and return it
//!
//! Both messages of a turn share a `turn_id`. A caller that retries a turn
//! with the same id never duplicates messages: a stored reply is returned
//! as-is, and a stored human message is reused instead of re-appended.
//! A retry is only resumed while its human message is still the last one in
//! the thread, and only with the same text.

use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use confab_types::config::ChatConfig;
use confab_types::conversation::{ConversationKey, ConversationSummary, Message, Role};
use confab_types::error::ChatError;
use confab_types::llm::{self, CompletionRequest, CompletionResponse, LlmError};

use crate::history::store::HistoryStore;
use crate::llm::box_provider::BoxLlmProvider;

use super::lock::KeyedLocks;
use super::prompt::resolve_system_prompt;
use super::session::{TurnReply, TurnRequest};
use super::transcript::render_transcript;

/// Sampling and timeout settings applied to every generation call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl GenerationSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// Runs chat turns against a history store and a generation provider.
///
/// Generic over `HistoryStore` so confab-core never depends on confab-infra.
pub struct ResponseOrchestrator<S: HistoryStore> {
    store: S,
    provider: BoxLlmProvider,
    settings: GenerationSettings,
    locks: KeyedLocks,
}

impl<S: HistoryStore> ResponseOrchestrator<S> {
    pub fn new(store: S, provider: BoxLlmProvider, settings: GenerationSettings) -> Self {
        Self {
            store,
            provider,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    /// Access the history store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Name of the configured generation provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one turn and return the reply text.
    pub async fn respond(&self, request: &TurnRequest) -> Result<TurnReply, ChatError> {
        let system_prompt =
            resolve_system_prompt(&request.persona, request.custom_prompt.as_deref())?;
        if request.session_id.is_empty() {
            return Err(ChatError::InvalidSessionId);
        }
        if request.user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let key = request.key();
        let turn_id = request.turn_id.unwrap_or_else(Uuid::now_v7);
        let _turn = self.locks.acquire(&key).await;

        let mut thread = self.store.fetch(&key).await?;

        if let Some(pos) = thread
            .iter()
            .position(|m| m.turn_id == turn_id && m.role == Role::Human)
        {
            if thread[pos].content != request.user_text {
                return Err(ChatError::TurnMismatch { turn_id });
            }

            if let Some(stored) = thread
                .iter()
                .find(|m| m.turn_id == turn_id && m.role == Role::Ai)
            {
                info!(conversation = %key, %turn_id, "Turn already completed, replaying stored reply");
                return Ok(TurnReply {
                    reply_text: stored.content.clone(),
                    turn_id,
                    key,
                    replayed: true,
                });
            }

            // The reply must land directly after its human message.
            if pos + 1 != thread.len() {
                return Err(ChatError::StaleTurn { turn_id });
            }
            debug!(conversation = %key, %turn_id, "Resuming turn with stored human message");
        } else {
            let human = Message::human(turn_id, request.user_text.clone());
            self.store.append(&key, &human).await?;
            thread.push(human);
        }

        let response = self.generate(&key, system_prompt, &thread).await?;

        let ai = Message::ai(turn_id, response.content.clone());
        if let Err(e) = self.store.append(&key, &ai).await {
            warn!(
                conversation = %key,
                %turn_id,
                error = %e,
                "Reply generated but not persisted; retry with the same turn_id"
            );
            return Err(e.into());
        }

        info!(
            conversation = %key,
            %turn_id,
            thread_len = thread.len() + 1,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Turn completed"
        );

        Ok(TurnReply {
            reply_text: response.content,
            turn_id,
            key,
            replayed: false,
        })
    }

    /// Full thread for a conversation, oldest first.
    pub async fn history(&self, key: &ConversationKey) -> Result<Vec<Message>, ChatError> {
        Ok(self.store.fetch(key).await?)
    }

    /// Every stored conversation, most recent first.
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        Ok(self.store.list_conversations().await?)
    }

    /// Plain-text transcript of a conversation.
    pub async fn export(&self, key: &ConversationKey) -> Result<String, ChatError> {
        let thread = self.store.fetch(key).await?;
        Ok(render_transcript(&key.persona, &thread))
    }

    async fn generate(
        &self,
        key: &ConversationKey,
        system_prompt: String,
        thread: &[Message],
    ) -> Result<CompletionResponse, LlmError> {
        let request = build_completion_request(key, system_prompt, thread, &self.settings);

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            messages = request.messages.len(),
        );

        let start = Instant::now();
        let timeout = self.settings.timeout;
        let result = tokio::time::timeout(timeout, self.provider.complete(&request))
            .instrument(span)
            .await
            .map_err(|_| LlmError::Timeout(timeout.as_millis() as u64))?;

        match &result {
            Ok(resp) => debug!(
                conversation = %key,
                elapsed_ms = start.elapsed().as_millis() as u64,
                stop_reason = %resp.stop_reason,
                "Generation finished"
            ),
            Err(e) => warn!(conversation = %key, error = %e, "Generation failed"),
        }
        result
    }
}

/// Build the provider request for a thread.
///
/// The model always comes from the conversation key.
pub fn build_completion_request(
    key: &ConversationKey,
    system_prompt: String,
    thread: &[Message],
    settings: &GenerationSettings,
) -> CompletionRequest {
    let messages = thread
        .iter()
        .map(|m| llm::Message {
            role: m.role.into(),
            content: m.content.clone(),
        })
        .collect();

    CompletionRequest {
        model: key.model.clone(),
        messages,
        system: Some(system_prompt),
        max_tokens: settings.max_tokens,
        temperature: Some(settings.temperature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use confab_types::conversation::AppendOutcome;
    use confab_types::error::RepositoryError;
    use confab_types::llm::{MessageRole, ProviderCapabilities, StopReason, Usage};
    use confab_types::persona::BuiltinPersona;

    use crate::history::memory::InMemoryHistoryStore;
    use crate::llm::provider::LlmProvider;

    const MODEL: &str = "llama-3.3-70b-versatile";

    // --- Mock provider ---

    #[derive(Clone, Default)]
    struct Recorder {
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl Recorder {
        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> CompletionRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    struct MockProvider {
        recorder: Recorder,
        capabilities: ProviderCapabilities,
        delay: Duration,
        fail: bool,
    }

    impl MockProvider {
        fn new(recorder: &Recorder) -> Self {
            Self {
                recorder: recorder.clone(),
                capabilities: ProviderCapabilities {
                    max_context_tokens: 128_000,
                    max_output_tokens: 8_192,
                },
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let n = {
                let mut requests = self.recorder.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len()
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(LlmError::Provider {
                    message: "quota exceeded".to_string(),
                });
            }
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(CompletionResponse {
                id: format!("resp-{n}"),
                content: format!("reply #{n} to: {last}"),
                model: request.model.clone(),
                stop_reason: StopReason::EndTurn,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            })
        }
    }

    // --- Store with failure injection ---

    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryHistoryStore,
        unreachable: AtomicBool,
        fail_ai_appends: AtomicBool,
        appends: AtomicUsize,
    }

    impl HistoryStore for FlakyStore {
        async fn fetch(&self, key: &ConversationKey) -> Result<Vec<Message>, RepositoryError> {
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(RepositoryError::Connection("connection refused".to_string()));
            }
            self.inner.fetch(key).await
        }

        async fn append(
            &self,
            key: &ConversationKey,
            message: &Message,
        ) -> Result<AppendOutcome, RepositoryError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            if self.unreachable.load(Ordering::SeqCst)
                || (message.role == Role::Ai && self.fail_ai_appends.load(Ordering::SeqCst))
            {
                return Err(RepositoryError::Connection("connection refused".to_string()));
            }
            self.inner.append(key, message).await
        }

        async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
            self.inner.list_conversations().await
        }
    }

    fn orchestrator(provider: MockProvider) -> ResponseOrchestrator<FlakyStore> {
        ResponseOrchestrator::new(
            FlakyStore::default(),
            BoxLlmProvider::new(provider),
            GenerationSettings::default(),
        )
    }

    fn turn(persona: &str, text: &str) -> TurnRequest {
        TurnRequest {
            session_id: "abc123".to_string(),
            persona: persona.to_string(),
            model: MODEL.to_string(),
            user_text: text.to_string(),
            custom_prompt: None,
            turn_id: None,
        }
    }

    #[tokio::test]
    async fn test_two_turns_build_ordered_thread() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let key = ConversationKey::resolve("abc123", "Iron Man", MODEL);

        let first = orch.respond(&turn("Iron Man", "Who are you?")).await.unwrap();
        let thread = orch.history(&key).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].role, Role::Human);
        assert_eq!(thread[0].content, "Who are you?");
        assert_eq!(thread[1].role, Role::Ai);
        assert_eq!(thread[1].content, first.reply_text);

        orch.respond(&turn("Iron Man", "And your suit?")).await.unwrap();
        let thread2 = orch.history(&key).await.unwrap();
        assert_eq!(thread2.len(), 4);
        assert_eq!(&thread2[..2], &thread[..]);
        assert_eq!(thread2[2].content, "And your suit?");
        assert_eq!(thread2[3].role, Role::Ai);
        assert_eq!(thread2[2].turn_id, thread2[3].turn_id);

        // Second request carried the whole prior thread plus the new message.
        let second = recorder.request(1);
        let contents: Vec<&str> = second.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[0], "Who are you?");
        assert_eq!(contents[2], "And your suit?");
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_builtin_persona_ignores_custom_prompt() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Sherlock Holmes", "Hello");
        req.custom_prompt = Some("You are a pirate.".to_string());

        orch.respond(&req).await.unwrap();
        assert_eq!(
            recorder.request(0).system.as_deref(),
            Some(BuiltinPersona::SherlockHolmes.system_prompt())
        );
    }

    #[tokio::test]
    async fn test_custom_persona_uses_caller_prompt() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Custom", "Ahoy");
        req.custom_prompt = Some("You are a pirate.".to_string());

        orch.respond(&req).await.unwrap();
        assert_eq!(recorder.request(0).system.as_deref(), Some("You are a pirate."));
    }

    #[tokio::test]
    async fn test_custom_blank_prompt_writes_nothing() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Custom", "Hello");
        req.custom_prompt = Some("   ".to_string());

        let err = orch.respond(&req).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidPersonaPrompt { .. }));
        assert_eq!(orch.store().appends.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.calls(), 0);
        assert!(orch.history(&req.key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_before_io() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));

        let mut no_session = turn("Iron Man", "hi");
        no_session.session_id = String::new();
        assert!(matches!(
            orch.respond(&no_session).await.unwrap_err(),
            ChatError::InvalidSessionId
        ));

        let empty = turn("Iron Man", "  \n");
        assert!(matches!(
            orch.respond(&empty).await.unwrap_err(),
            ChatError::EmptyMessage
        ));
        assert_eq!(orch.store().appends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_uses_key_model_and_settings() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Marie Curie", "Tell me about radium");
        req.model = "mixtral-8x7b-32768".to_string();

        orch.respond(&req).await.unwrap();
        let sent = recorder.request(0);
        assert_eq!(sent.model, "mixtral-8x7b-32768");
        assert_eq!(sent.temperature, Some(0.3));
        assert_eq!(sent.max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_generation_failure_is_surfaced_unmodified() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder).failing());
        let req = turn("Iron Man", "Who are you?");

        let err = orch.respond(&req).await.unwrap_err();
        match err {
            ChatError::Generation(LlmError::Provider { message }) => {
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }

        // The human message was persisted before the call; no reply was.
        let thread = orch.history(&req.key()).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].role, Role::Human);
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let recorder = Recorder::default();
        let orch = ResponseOrchestrator::new(
            FlakyStore::default(),
            BoxLlmProvider::new(MockProvider::new(&recorder).slow(Duration::from_millis(500))),
            GenerationSettings {
                timeout: Duration::from_millis(20),
                ..GenerationSettings::default()
            },
        );

        let err = orch.respond(&turn("Iron Man", "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(LlmError::Timeout(20))));
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_before_generation() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        orch.store().unreachable.store(true, Ordering::SeqCst);

        let err = orch.respond(&turn("Iron Man", "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::StoreUnavailable(_)));
        assert_eq!(recorder.calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_lost_reply_does_not_duplicate() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Iron Man", "Who are you?");
        req.turn_id = Some(Uuid::now_v7());

        orch.store().fail_ai_appends.store(true, Ordering::SeqCst);
        let err = orch.respond(&req).await.unwrap_err();
        assert!(matches!(err, ChatError::StoreUnavailable(_)));
        assert_eq!(orch.history(&req.key()).await.unwrap().len(), 1);

        // Retry the same turn once the store recovers.
        orch.store().fail_ai_appends.store(false, Ordering::SeqCst);
        let reply = orch.respond(&req).await.unwrap();
        assert!(!reply.replayed);
        assert_eq!(recorder.calls(), 2);

        let thread = orch.history(&req.key()).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].role, Role::Human);
        assert_eq!(thread[1].content, reply.reply_text);
        // The retried call saw the human message exactly once.
        assert_eq!(recorder.request(1).messages.len(), 1);
    }

    #[tokio::test]
    async fn test_session_id_is_used_verbatim() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Iron Man", "hi");
        req.session_id = " ".to_string();

        let reply = orch.respond(&req).await.unwrap();
        assert_eq!(reply.key.session_id, " ");
        let padded = ConversationKey::resolve(" ", "Iron Man", MODEL);
        assert_eq!(orch.history(&padded).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_after_later_turn_is_rejected() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut first = turn("Iron Man", "Who are you?");
        first.turn_id = Some(Uuid::now_v7());

        orch.store().fail_ai_appends.store(true, Ordering::SeqCst);
        orch.respond(&first).await.unwrap_err();
        orch.store().fail_ai_appends.store(false, Ordering::SeqCst);

        orch.respond(&turn("Iron Man", "And your suit?")).await.unwrap();
        let before = orch.history(&first.key()).await.unwrap();
        assert_eq!(before.len(), 3);

        let err = orch.respond(&first).await.unwrap_err();
        assert!(matches!(err, ChatError::StaleTurn { turn_id } if Some(turn_id) == first.turn_id));
        assert!(err.is_caller_error());
        assert_eq!(recorder.calls(), 2);
        assert_eq!(orch.history(&first.key()).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_reused_turn_id_with_new_text_is_rejected() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut original = turn("Iron Man", "Who are you?");
        original.turn_id = Some(Uuid::now_v7());
        let mut changed = original.clone();
        changed.user_text = "What is the weather?".to_string();

        // Only the human message is stored.
        orch.store().fail_ai_appends.store(true, Ordering::SeqCst);
        orch.respond(&original).await.unwrap_err();
        orch.store().fail_ai_appends.store(false, Ordering::SeqCst);
        assert!(matches!(
            orch.respond(&changed).await.unwrap_err(),
            ChatError::TurnMismatch { .. }
        ));
        assert_eq!(recorder.calls(), 1);

        // Completed turn.
        orch.respond(&original).await.unwrap();
        assert!(matches!(
            orch.respond(&changed).await.unwrap_err(),
            ChatError::TurnMismatch { .. }
        ));
        assert_eq!(recorder.calls(), 2);
        assert_eq!(orch.history(&original.key()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_completed_turn_is_replayed() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let mut req = turn("Iron Man", "Who are you?");
        req.turn_id = Some(Uuid::now_v7());

        let first = orch.respond(&req).await.unwrap();
        let again = orch.respond(&req).await.unwrap();

        assert!(again.replayed);
        assert_eq!(again.reply_text, first.reply_text);
        assert_eq!(again.turn_id, first.turn_id);
        assert_eq!(recorder.calls(), 1);
        assert_eq!(orch.history(&req.key()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_key_do_not_interleave() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder).slow(Duration::from_millis(50)));
        let a = turn("Iron Man", "first");
        let b = turn("Iron Man", "second");

        let (ra, rb) = tokio::join!(orch.respond(&a), orch.respond(&b));
        ra.unwrap();
        rb.unwrap();

        let thread = orch.history(&a.key()).await.unwrap();
        assert_eq!(thread.len(), 4);
        for pair in thread.chunks(2) {
            assert_eq!(pair[0].role, Role::Human);
            assert_eq!(pair[1].role, Role::Ai);
            assert_eq!(pair[0].turn_id, pair[1].turn_id);
        }
        // Whichever turn ran second saw the first turn's full exchange.
        assert_eq!(recorder.request(1).messages.len(), 3);
    }

    #[tokio::test]
    async fn test_different_keys_run_independently() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        orch.respond(&turn("Iron Man", "hi")).await.unwrap();
        orch.respond(&turn("Marie Curie", "hi")).await.unwrap();

        let iron = ConversationKey::resolve("abc123", "Iron Man", MODEL);
        let curie = ConversationKey::resolve("abc123", "Marie Curie", MODEL);
        assert_eq!(orch.history(&iron).await.unwrap().len(), 2);
        assert_eq!(orch.history(&curie).await.unwrap().len(), 2);
        assert_eq!(recorder.request(1).messages.len(), 1);
        assert_eq!(orch.conversations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_export_renders_thread() {
        let recorder = Recorder::default();
        let orch = orchestrator(MockProvider::new(&recorder));
        let req = turn("Iron Man", "Who are you?");
        let reply = orch.respond(&req).await.unwrap();

        let text = orch.export(&req.key()).await.unwrap();
        assert!(text.starts_with("Character: Iron Man\n\n"));
        assert!(text.contains("Human: Who are you?\n\n"));
        assert!(text.contains(&format!("Ai: {}\n\n", reply.reply_text)));
    }
}
