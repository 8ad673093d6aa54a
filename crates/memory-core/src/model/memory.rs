//! The `Memory` record — the fundamental persisted unit.
//!
//! `kind` discriminates between fact / episode / relation / reflection.
//! Each kind is a typed *view* over the same `metadata` map rather than a
//! separate struct, so storage and search never need to know which kind
//! they are holding.

use super::{EmotionTag, Metadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four memory kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    #[default]
    Fact,
    Episode,
    Relation,
    /// Only ever created by LifecycleManager, never directly by a caller.
    Reflection,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Fact => "fact",
            MemoryKind::Episode => "episode",
            MemoryKind::Relation => "relation",
            MemoryKind::Reflection => "reflection",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fact" => MemoryKind::Fact,
            "episode" => MemoryKind::Episode,
            "relation" => MemoryKind::Relation,
            "reflection" => MemoryKind::Reflection,
            _ => MemoryKind::Fact,
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted memory: fact, episode, relation, or reflection.
///
/// Invariants: `importance` is non-negative; `decay_factor` resets to 1.0
/// on access; `vectorized=true` implies a row in the vector index's id
/// map; `archived=true` excludes the row from retrieval and from the
/// vector index.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content: String,
    pub kind: MemoryKind,
    pub importance: f32,
    pub access_count: i64,
    pub last_accessed: DateTime<Utc>,
    pub decay_factor: f32,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub archived: bool,
    pub vectorized: bool,
    pub emotion_tag: Option<EmotionTag>,
    pub conflict_flag: bool,
    /// True if a human (or explicit "remember this") pinned this memory,
    /// exempting it from dynamic-percentile archival.
    pub user_pinned: bool,
}

impl Memory {
    /// Create a new, not-yet-persisted memory with sane defaults.
    pub fn new(content: impl Into<String>, kind: MemoryKind, importance: f32) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            content: content.into(),
            kind,
            importance: importance.clamp(0.0, 0.95),
            access_count: 0,
            last_accessed: now,
            decay_factor: 1.0,
            tags: Vec::new(),
            metadata: Metadata::new(),
            archived: false,
            vectorized: false,
            emotion_tag: None,
            conflict_flag: false,
            user_pinned: false,
        }
    }

    /// Effective importance after decay — the value archival and rerank
    /// actually compare against.
    pub fn effective_importance(&self) -> f32 {
        (self.importance * self.decay_factor).clamp(0.0, 1.0)
    }

    pub fn as_fact(&self) -> Option<FactView<'_>> {
        (self.kind == MemoryKind::Fact).then_some(FactView(self))
    }

    pub fn as_episode(&self) -> Option<EpisodeView<'_>> {
        (self.kind == MemoryKind::Episode).then_some(EpisodeView(self))
    }

    pub fn as_relation(&self) -> Option<RelationView<'_>> {
        (self.kind == MemoryKind::Relation).then_some(RelationView(self))
    }
}

/// Typed read-only view of a fact's `(subject, predicate, object)` triple
/// and confidence, stored in `Memory::metadata`.
pub struct FactView<'a>(&'a Memory);

impl FactView<'_> {
    pub fn subject(&self) -> Option<&str> {
        self.0.metadata.get("subject").and_then(|v| v.as_str())
    }
    pub fn predicate(&self) -> Option<&str> {
        self.0.metadata.get("predicate").and_then(|v| v.as_str())
    }
    pub fn object(&self) -> Option<&str> {
        self.0.metadata.get("object").and_then(|v| v.as_str())
    }
    pub fn confidence(&self) -> f32 {
        self.0
            .metadata
            .get("confidence")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(1.0)
    }
}

/// Typed read-only view of an episode's emotion/affinity fields.
pub struct EpisodeView<'a>(&'a Memory);

impl EpisodeView<'_> {
    pub fn emotion_tag(&self) -> Option<EmotionTag> {
        self.0.emotion_tag
    }
    pub fn affinity_change(&self) -> i64 {
        self.0
            .metadata
            .get("affinity_change")
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }
}

/// Typed read-only view of a relation's `(source_entity, edge_label,
/// target_entity)` triple.
pub struct RelationView<'a>(&'a Memory);

impl RelationView<'_> {
    pub fn source_entity(&self) -> Option<&str> {
        self.0.metadata.get("source_entity").and_then(|v| v.as_str())
    }
    pub fn edge_label(&self) -> Option<&str> {
        self.0.metadata.get("edge_label").and_then(|v| v.as_str())
    }
    pub fn target_entity(&self) -> Option<&str> {
        self.0.metadata.get("target_entity").and_then(|v| v.as_str())
    }
}
