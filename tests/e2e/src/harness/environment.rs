//! Owned collaborator bundle for end-to-end scenarios.
//!
//! Everything a `UnifiedContextManager` borrows lives here as a plain
//! owned field, so a test can hold one `TestEnvironment` for its whole
//! run, ask it for a `ucm()` borrow per interaction, and separately
//! drive the vectorize queue or simulate a restart between turns.

use std::path::PathBuf;
use std::time::Duration;

use companion_runtime::llm::{LlmClient, MockLlmClient};
use companion_runtime::{InteractionRequest, InteractionSource, RuntimeConfig, UnifiedContextManager};
use memory_core::embeddings::MockEmbeddingClient;
use memory_core::model::{Memory, MemoryKind};
use memory_core::queue::VectorizeQueue;
use memory_core::search::VectorIndex;
use memory_core::storage::Store;
use tempfile::TempDir;

/// A file-backed store plus the rest of the collaborators a
/// `UnifiedContextManager` needs, all owned so the harness can reopen
/// the store or drain the queue between interactions without fighting
/// the borrow checker over a long-lived manager.
pub struct TestEnvironment {
    pub store: Store,
    pub index: VectorIndex,
    pub embedder: MockEmbeddingClient,
    pub queue: VectorizeQueue,
    pub llm: Box<dyn LlmClient>,
    pub config: RuntimeConfig,
    db_path: PathBuf,
    queue_snapshot_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    /// A fresh, empty environment backed by a temp-dir SQLite file.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("companion.db");
        let queue_snapshot_path = temp_dir.path().join("queue.json");
        let store = Store::open(Some(db_path.clone())).expect("failed to open test store");

        Self {
            store,
            index: VectorIndex::new().expect("failed to build vector index"),
            embedder: MockEmbeddingClient::new(384),
            queue: VectorizeQueue::new(),
            llm: Box::new(MockLlmClient::new("That's good to know. [EMOTION:happy:0.6]")),
            config: RuntimeConfig::default(),
            db_path,
            queue_snapshot_path,
            _temp_dir: temp_dir,
        }
    }

    pub fn with_llm_text(mut self, text: impl Into<String>) -> Self {
        self.llm = Box::new(MockLlmClient::new(text));
        self
    }

    pub fn with_llm_delay(mut self, text: impl Into<String>, delay: Duration) -> Self {
        self.llm = Box::new(MockLlmClient::new(text).with_delay(delay));
        self
    }

    /// Swap in an arbitrary collaborator, e.g. one that records the
    /// prompt it was handed for later inspection.
    pub fn with_llm(mut self, llm: impl LlmClient + 'static) -> Self {
        self.llm = Box::new(llm);
        self
    }

    /// Borrow a manager over this environment's collaborators for one
    /// session. Cheap to call more than once per test; each call starts
    /// fresh working memory and mood state, so hold onto one instance
    /// across turns that need to share context.
    pub fn ucm(&self, session_id: impl Into<String>) -> UnifiedContextManager<'_> {
        UnifiedContextManager::new(&self.store, &self.index, &self.embedder, &self.queue, self.llm.as_ref(), &self.config, session_id)
    }

    /// Insert a memory directly, bypassing the interaction pipeline, to
    /// set up prior state (cold-start-with-history, contradiction
    /// seeding, recall fixtures).
    pub fn seed_memory(&self, content: impl Into<String>, kind: MemoryKind, importance: f32) -> String {
        self.store.insert(Memory::new(content, kind, importance)).expect("seed insert failed")
    }

    /// Drain one batch off the vectorize queue into the index.
    pub fn drain_queue(&mut self) -> usize {
        self.queue.run_once(&self.store, &mut self.index, &self.embedder).expect("queue drain failed")
    }

    /// Persist the queue's pending lanes to disk, simulating a clean
    /// shutdown hook.
    pub fn checkpoint_queue(&self) {
        self.queue.save(&self.queue_snapshot_path).expect("queue checkpoint failed");
    }

    /// Simulate a process restart: reopen the store from its file and
    /// reload the queue from its last checkpoint, discarding the
    /// in-memory vector index (never persisted mid-session) and any
    /// queue state accumulated after the last checkpoint.
    pub fn restart(&mut self) {
        self.store = Store::open(Some(self.db_path.clone())).expect("failed to reopen store");
        self.index = VectorIndex::new().expect("failed to rebuild vector index");
        self.queue = VectorizeQueue::load(&self.queue_snapshot_path).expect("failed to reload queue checkpoint");
    }

    pub fn chat(&self, session_id: &str, text: &str) -> InteractionRequest {
        InteractionRequest {
            source: InteractionSource::ChatInput,
            event_type: "message".into(),
            payload: serde_json::json!({ "text": text, "session": session_id }),
        }
    }

    pub fn passive(&self, event_type: &str) -> InteractionRequest {
        InteractionRequest {
            source: InteractionSource::PassiveTrigger,
            event_type: event_type.into(),
            payload: serde_json::json!({}),
        }
    }
}
