//! Three-layer memory engine for a local AI companion.
//!
//! - [`storage`] — relational + full-text persistence (C1)
//! - [`search`] — vector index and hybrid retrieval (C2, C4)
//! - [`queue`] — background vectorization (C3)
//! - [`lifecycle`] — importance scoring, decay, archival, conflicts, reflections (C5)
//! - [`model`] — working-memory data types shared with companion-runtime (C6's types)
//! - [`embeddings`] — embedding generation seam
//! - [`llm`] — LLM collaborator seam shared with companion-runtime's tier handlers

pub mod config;
pub mod embeddings;
pub mod lifecycle;
pub mod llm;
pub mod model;
pub mod queue;
pub mod search;
pub mod storage;

pub use model::{
    Checkpoint, CompanionVitals, ConversationTurn, EmotionTag, EmotionValue, Memory, MemoryKind,
    PendingVectorize, Role, SessionState,
};
pub use search::{HybridRetriever, RetrievalResult, VectorIndex};
pub use storage::{Store, StorageError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
