//! Tunables shared by [`crate::search::HybridRetriever`] and
//! [`crate::lifecycle::LifecycleManager`] — kept as plain data so the
//! keyword/antonym tables can be overridden without touching either.

use std::collections::HashMap;

/// Weights and thresholds driving the hybrid-search rerank formula and
/// strategy selection.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub fts_top_k: usize,
    pub vector_top_k: usize,
    pub min_vector_results: usize,
    pub final_top_k: usize,
    pub similarity_threshold: f32,

    pub weight_similarity: f32,
    pub weight_recency: f32,
    pub weight_importance: f32,
    pub weight_frequency: f32,
    pub recency_decay_days: f32,

    pub smart_selection: bool,
    pub fallback_strategy: Strategy,

    /// Time-deixis phrase → number of days back from now the window
    /// should open (the window always closes at "now").
    pub time_deixis_days: HashMap<&'static str, i64>,

    /// Closed-class function words excluded from entity-word extraction.
    pub entity_stopwords: Vec<&'static str>,
    pub min_entity_word_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let mut time_deixis_days = HashMap::new();
        time_deixis_days.insert("just now", 0);
        time_deixis_days.insert("today", 0);
        time_deixis_days.insert("yesterday", 1);
        time_deixis_days.insert("recently", 7);
        time_deixis_days.insert("last time", 7);
        time_deixis_days.insert("long ago", 365);

        Self {
            fts_top_k: 15,
            vector_top_k: 20,
            min_vector_results: 3,
            final_top_k: 5,
            similarity_threshold: 0.65,
            weight_similarity: 0.4,
            weight_recency: 0.3,
            weight_importance: 0.2,
            weight_frequency: 0.1,
            recency_decay_days: 7.0,
            smart_selection: true,
            fallback_strategy: Strategy::Parallel,
            time_deixis_days,
            entity_stopwords: vec![
                "the", "a", "an", "is", "was", "are", "were", "be", "been", "being", "i", "you",
                "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "this", "that",
                "and", "or", "but", "of", "to", "in", "on", "at", "for", "with",
            ],
            min_entity_word_len: 2,
        }
    }
}

/// Strategy selected for a single retrieval call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FtsPrimary,
    VectorPrimary,
    Parallel,
}

/// Tunables for [`crate::lifecycle::LifecycleManager`].
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub default_importance: f32,
    pub milestone_importance: f32,
    pub affinity_shift_threshold: i64,
    pub affinity_shift_importance: f32,
    pub importance_keywords: Vec<&'static str>,
    pub keyword_importance: f32,

    pub decay_rate: f32,
    pub archive_percentile: f64,
    pub archive_floor: f32,
    pub archive_min_access_count: i64,
    pub archive_min_age_days: i64,

    /// `(positive, negative)` stance-word pairs; conflict detection treats
    /// either ordering as a match.
    pub antonym_pairs: Vec<(&'static str, &'static str)>,
    pub conflict_window_hours: i64,

    pub reflection_hour_utc: u32,
    pub reflection_idle_minutes: i64,
    pub reflection_importance: f32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_importance: 0.5,
            milestone_importance: 0.95,
            affinity_shift_threshold: 5,
            affinity_shift_importance: 0.8,
            importance_keywords: vec![
                "birthday", "important", "remember", "like", "dislike", "love", "hate", "anniversary",
            ],
            keyword_importance: 0.6,
            decay_rate: 0.98,
            archive_percentile: 20.0,
            archive_floor: 0.1,
            archive_min_access_count: 2,
            archive_min_age_days: 30,
            antonym_pairs: vec![
                ("like", "dislike"),
                ("love", "hate"),
                ("always", "never"),
                ("enjoy", "avoid"),
                ("want", "refuse"),
                ("喜欢", "讨厌"),
                ("爱", "恨"),
                ("总是", "从不"),
                ("享受", "回避"),
                ("想要", "拒绝"),
            ],
            conflict_window_hours: 168,
            reflection_hour_utc: 3,
            reflection_idle_minutes: 30,
            reflection_importance: 0.8,
        }
    }
}
