//! Unified context manager (C10) — the sole entry point for every
//! interaction: classify, retrieve, generate, write back, enqueue.

pub mod state;

use chrono::Utc;
use memory_core::embeddings::EmbeddingClient;
use memory_core::lifecycle::LifecycleManager;
use memory_core::model::{ConversationTurn, EmotionTag, EmotionValue, Memory, MemoryKind, Role};
use memory_core::queue::VectorizeQueue;
use memory_core::search::{HybridRetriever, VectorIndex};
use memory_core::storage::Store;
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::config::{PromptMode, RuntimeConfig};
use crate::llm::LlmClient;
use crate::prompt::PromptInputs;
use crate::scene::{InteractionRequest, InteractionSource, MemoryRetrieval, SceneClassifier};
use crate::tiers::rule::RuleContext;
use crate::tiers::{fallback_chain, GeneratedResponse, TierHandlers};
use crate::working_memory::WorkingMemory;
use state::{MoodState, StateMachine};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum UcmError {
    #[error(transparent)]
    Storage(#[from] memory_core::storage::StorageError),
    #[error(transparent)]
    Retrieval(#[from] memory_core::search::RetrievalError),
    #[error(transparent)]
    Queue(#[from] memory_core::queue::VectorizeError),
    #[error(transparent)]
    Lifecycle(#[from] memory_core::lifecycle::LifecycleError),
}

pub type Result<T> = std::result::Result<T, UcmError>;

/// How much of the new interaction gets persisted as a `Memory`, and at
/// what default importance before `LifecycleManager` scoring runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteLevel {
    Full,
    Summary,
    ResultOnly,
    None,
}

fn write_policy(source: InteractionSource) -> (WriteLevel, f32) {
    match source {
        InteractionSource::ChatInput => (WriteLevel::Full, 0.6),
        InteractionSource::ToolResult => (WriteLevel::Summary, 0.5),
        InteractionSource::PluginAction => (WriteLevel::Summary, 0.4),
        InteractionSource::SystemEvent => (WriteLevel::Summary, 0.5),
        InteractionSource::GameInteraction => (WriteLevel::ResultOnly, 0.3),
        InteractionSource::PassiveTrigger => (WriteLevel::None, 0.0),
    }
}

/// Per-turn trace record; a caller inspects `trace_spans` to see which
/// pipeline stages ran.
#[derive(Debug, Clone)]
pub struct InteractionContext {
    pub trace_id: String,
    pub started_at: chrono::DateTime<Utc>,
    pub request: InteractionRequest,
}

#[derive(Debug, Clone)]
pub struct InteractionResponse {
    pub request_id: String,
    pub success: bool,
    pub response_text: String,
    pub emotion: EmotionValue,
    pub state_changes: Option<MoodState>,
    pub trace_spans: Vec<String>,
}

pub struct UnifiedContextManager<'a> {
    store: &'a Store,
    vector_index: &'a VectorIndex,
    embedder: &'a dyn EmbeddingClient,
    queue: &'a VectorizeQueue,
    lifecycle: LifecycleManager,
    llm: &'a dyn LlmClient,
    config: &'a RuntimeConfig,
    working_memory: std::sync::Mutex<WorkingMemory>,
    handlers: TierHandlers,
    cache: ResponseCache,
    mood: std::sync::Mutex<StateMachine>,
    positive_streak: std::sync::atomic::AtomicU32,
}

impl<'a> UnifiedContextManager<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a Store,
        vector_index: &'a VectorIndex,
        embedder: &'a dyn EmbeddingClient,
        queue: &'a VectorizeQueue,
        llm: &'a dyn LlmClient,
        config: &'a RuntimeConfig,
        session_id: impl Into<String>,
    ) -> Self {
        let cache = ResponseCache::new(config.response_cache_capacity, config.response_cache_ttl);
        let working_memory = WorkingMemory::new(session_id)
            .with_capacity(config.working_memory_capacity)
            .with_session_timeout_minutes(config.session_timeout_minutes);

        Self {
            store,
            vector_index,
            embedder,
            queue,
            lifecycle: LifecycleManager::new(),
            llm,
            config,
            working_memory: std::sync::Mutex::new(working_memory),
            handlers: TierHandlers::new(),
            cache,
            mood: std::sync::Mutex::new(StateMachine::new()),
            positive_streak: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub async fn process_interaction(&self, request: InteractionRequest) -> Result<InteractionResponse> {
        let context = InteractionContext {
            trace_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            request,
        };
        let mut trace_spans = vec!["context_created".to_string()];

        let classifier = SceneClassifier::new(self.config);
        let decision = classifier.classify(&context.request);
        trace_spans.push(format!("classified:{}", decision.scene_id));

        let query_text = context.request.payload.get("text").and_then(|v| v.as_str()).unwrap_or_default();

        let retrieval = if decision.memory_retrieval != MemoryRetrieval::None && !query_text.is_empty() {
            let retriever = HybridRetriever::new(self.store, self.vector_index, self.embedder);
            Some(retriever.retrieve(query_text, false)?)
        } else {
            None
        };
        trace_spans.push("retrieved".to_string());

        let generated = self.generate(&context, &decision, query_text, retrieval.as_ref()).await;
        trace_spans.push(format!("generated:tier{}", generated.tier_used));

        self.record_turn(&context, &generated);

        let state_changes = self.update_mood(&generated.emotion_tag, generated.emotion_intensity);

        if let Err(err) = self.writeback(&context, &generated) {
            tracing::warn!(error = %err, "failed to persist interaction as memory");
        }
        trace_spans.push("writeback".to_string());

        Ok(InteractionResponse {
            request_id: context.trace_id,
            success: true,
            response_text: generated.text,
            emotion: EmotionValue::new(generated.emotion_tag, generated.emotion_intensity).unwrap_or_else(|_| EmotionValue::neutral()),
            state_changes,
            trace_spans,
        })
    }

    async fn generate(
        &self,
        context: &InteractionContext,
        decision: &crate::scene::SceneDecision,
        query_text: &str,
        retrieval: Option<&memory_core::search::RetrievalResult>,
    ) -> GeneratedResponse {
        let payload = &context.request.payload;

        if decision.default_tier == 3 {
            let working_memory = self.working_memory.lock().expect("working memory lock poisoned");
            let recent_turns: Vec<ConversationTurn> = working_memory.recent(8).to_vec();
            drop(working_memory);

            let (ranked, no_relevant_memory) = match retrieval {
                Some(result) => (result.matches.clone(), result.no_relevant_memory),
                None => (Vec::new(), true),
            };

            let inputs = PromptInputs {
                identity: "You are a small desktop companion with your own moods and memory.",
                working_memory: &recent_turns,
                environment: query_text,
                long_term_summary: "",
                ranked_memories: &ranked,
                no_relevant_memory,
            };

            if let Ok(response) = self.handlers.tier3(self.llm, &inputs, self.config, PromptMode::Standard).await {
                self.cache.insert(&decision.scene_id, payload, response.clone());
                return response;
            }
        }

        let rule_context = RuleContext {
            payload: payload.clone(),
            vitals: self.working_memory.lock().expect("working memory lock poisoned").session().vitals,
            now: Utc::now(),
            repeat_count: 0,
        };

        fallback_chain(&self.handlers, decision, payload, Some(&rule_context), Some(&self.cache), None)
    }

    fn record_turn(&self, context: &InteractionContext, generated: &GeneratedResponse) {
        let mut working_memory = self.working_memory.lock().expect("working memory lock poisoned");
        if let Some(text) = context.request.payload.get("text").and_then(|v| v.as_str()) {
            working_memory.append(ConversationTurn::new(Role::User, text, working_memory.session().session_id.clone()));
        }
        working_memory.append(ConversationTurn::new(
            Role::Assistant,
            generated.text.clone(),
            working_memory.session().session_id.clone(),
        ));
    }

    fn update_mood(&self, tag: &EmotionTag, intensity: f32) -> Option<MoodState> {
        let is_positive = matches!(tag, EmotionTag::Happy | EmotionTag::Excited);
        let streak = if is_positive {
            self.positive_streak.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1
        } else {
            self.positive_streak.store(0, std::sync::atomic::Ordering::Relaxed);
            0
        };

        let vitals = self.working_memory.lock().expect("working memory lock poisoned").session().vitals;
        let emotion = EmotionValue::new(*tag, intensity).ok();
        let trigger = if streak >= 3 {
            Some(state::OverrideTrigger::ConsecutivePositiveStreak(streak))
        } else {
            emotion.filter(|e| e.intensity >= 0.8).map(state::OverrideTrigger::HighIntensityEmotion)
        };

        let hour = Utc::now().format("%H").to_string().parse::<u32>().unwrap_or(12);
        let mut mood = self.mood.lock().expect("mood lock poisoned");
        Some(mood.transition(&vitals, hour, false, emotion, trigger))
    }

    fn writeback(&self, context: &InteractionContext, generated: &GeneratedResponse) -> Result<()> {
        let (level, default_importance) = write_policy(context.request.source);
        if level == WriteLevel::None {
            return Ok(());
        }

        let content = match level {
            WriteLevel::Full => format!(
                "{}\n{}",
                context.request.payload.get("text").and_then(|v| v.as_str()).unwrap_or_default(),
                generated.text
            ),
            WriteLevel::Summary => generated.text.clone(),
            WriteLevel::ResultOnly => context.request.payload.to_string(),
            WriteLevel::None => unreachable!(),
        };

        let importance = self.lifecycle.score_importance(&content, false, None).max(default_importance);
        let mut memory = Memory::new(content, MemoryKind::Episode, importance);
        memory.emotion_tag = Some(generated.emotion_tag);

        let id = self.store.insert(memory.clone())?;
        let conflicts = self.lifecycle.detect_conflicts(self.store, &memory)?;
        for reflection in conflicts {
            self.store.insert(reflection)?;
        }

        self.queue.enqueue(memory_core::model::PendingVectorize::new(id, memory.content, importance))?;
        Ok(())
    }
}
