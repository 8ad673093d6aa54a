//! Runtime tunables for prompt assembly, scene classification, tier
//! handling, and the unified context manager — kept as plain data so a
//! deployment can override any of it without a code change.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::scene::{MemoryRetrieval, SceneType};

/// Token budget selected per call. `Extended` is an escape hatch above
/// the three named operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptMode {
    Lite,
    Standard,
    Deep,
    Extended,
}

impl PromptMode {
    pub fn total_tokens(&self) -> usize {
        match self {
            PromptMode::Lite => 16_000,
            PromptMode::Standard => 32_000,
            PromptMode::Deep => 64_000,
            PromptMode::Extended => 128_000,
        }
    }
}

/// Per-block token allocation, scaled linearly off the standard-mode
/// defaults by `PromptMode::total_tokens`.
#[derive(Debug, Clone, Copy)]
pub struct PromptBudget {
    pub identity: usize,
    pub working_memory: usize,
    pub environment: usize,
    pub long_term_summary: usize,
    pub memory_index: usize,
    pub memory_fulltext: usize,
    pub instructions: usize,
    pub reserved_output: usize,
}

impl PromptBudget {
    const STANDARD_TOTAL: f64 = 32_000.0;

    fn standard() -> Self {
        Self {
            identity: 2_500,
            working_memory: 8_000,
            environment: 1_000,
            long_term_summary: 2_500,
            memory_index: 3_000,
            memory_fulltext: 5_000,
            instructions: 1_000,
            reserved_output: 9_000,
        }
    }

    fn scaled(mode: PromptMode) -> Self {
        let standard = Self::standard();
        let factor = mode.total_tokens() as f64 / Self::STANDARD_TOTAL;
        let scale = |n: usize| ((n as f64) * factor).round() as usize;
        Self {
            identity: scale(standard.identity),
            working_memory: scale(standard.working_memory),
            environment: scale(standard.environment),
            long_term_summary: scale(standard.long_term_summary),
            memory_index: scale(standard.memory_index),
            memory_fulltext: scale(standard.memory_fulltext),
            instructions: scale(standard.instructions),
            reserved_output: scale(standard.reserved_output),
        }
    }

    pub fn total(&self) -> usize {
        self.identity
            + self.working_memory
            + self.environment
            + self.long_term_summary
            + self.memory_index
            + self.memory_fulltext
            + self.instructions
            + self.reserved_output
    }
}

/// A single row of the scene-tier lookup table.
#[derive(Debug, Clone)]
pub struct SceneRule {
    pub scene_type: SceneType,
    pub default_tier: u8,
    pub memory_retrieval: MemoryRetrieval,
    pub timeout_ms: u64,
}

/// Plain-data configuration carrying every tunable named across prompt
/// assembly, scene classification, tier handling, and lifecycle timing
/// that companion-runtime owns (as distinct from `memory_core::config`,
/// which owns retrieval/lifecycle weights that don't depend on prompt
/// or scene concepts).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub memory_index_count: usize,
    pub memory_fulltext_count: usize,
    pub no_relevant_memory_directive: String,

    pub tier1_timeout: Duration,
    pub tier2_timeout: Duration,
    pub tier3_timeout: Duration,
    pub embedding_timeout: Duration,

    pub response_cache_ttl: Duration,
    pub response_cache_capacity: usize,

    pub session_timeout_minutes: i64,
    pub working_memory_capacity: usize,

    /// `scene_id -> rule`; unmatched scene ids fall through to the
    /// ordered event/source rules in `SceneClassifier`.
    pub scene_tier_mapping: HashMap<String, SceneRule>,
}

impl RuntimeConfig {
    pub fn prompt_budget(&self, mode: PromptMode) -> PromptBudget {
        PromptBudget::scaled(mode)
    }

    /// Hash of the fields that matter for a hot-reload decision (the
    /// numeric/string tunables, not the derived lookup table), compared
    /// before each prompt build per the monotonic file-hash policy.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.memory_index_count.hash(&mut hasher);
        self.memory_fulltext_count.hash(&mut hasher);
        self.no_relevant_memory_directive.hash(&mut hasher);
        self.tier1_timeout.hash(&mut hasher);
        self.tier2_timeout.hash(&mut hasher);
        self.tier3_timeout.hash(&mut hasher);
        self.embedding_timeout.hash(&mut hasher);
        self.response_cache_ttl.hash(&mut hasher);
        self.response_cache_capacity.hash(&mut hasher);
        self.session_timeout_minutes.hash(&mut hasher);
        self.working_memory_capacity.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_index_count: 30,
            memory_fulltext_count: 3,
            no_relevant_memory_directive: "You have no relevant memory of this. Do not invent details; say so plainly.".into(),
            tier1_timeout: Duration::from_millis(50),
            tier2_timeout: Duration::from_millis(100),
            tier3_timeout: Duration::from_secs(3),
            embedding_timeout: Duration::from_secs(30),
            response_cache_ttl: Duration::from_secs(7 * 24 * 3600),
            response_cache_capacity: 512,
            session_timeout_minutes: 120,
            working_memory_capacity: 20,
            scene_tier_mapping: HashMap::new(),
        }
    }
}
