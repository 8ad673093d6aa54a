//! Hybrid keyword + semantic retrieval: the centerpiece read path.
//!
//! Strategy selection, fallback, and reranking follow a fixed pipeline so
//! that identical inputs over an identical store always produce the same
//! ranked list — no dependence on hash-map iteration order anywhere in
//! the path.

use super::entity::{extract_entity_words, infer_time_window};
use super::vector::{VectorIndex, VectorSearchError};
use crate::config::{RetrievalConfig, Strategy};
use crate::embeddings::{EmbeddingClient, EmbeddingError};
use crate::model::Memory;
use crate::storage::{Store, StorageError};
use chrono::Utc;
use std::collections::HashMap;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    VectorSearch(#[from] VectorSearchError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// The per-candidate score breakdown, kept around for tests and
/// observability rather than collapsed into a single number.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreBreakdown {
    pub similarity: f32,
    pub recency: f32,
    pub importance: f32,
    pub frequency: f32,
    pub final_score: f32,
}

#[derive(Debug, Clone)]
pub struct RankedMemory {
    pub memory: Memory,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub matches: Vec<RankedMemory>,
    pub strategy_used: Strategy,
    pub no_relevant_memory: bool,
}

pub struct HybridRetriever<'a> {
    store: &'a Store,
    vector_index: &'a VectorIndex,
    embedder: &'a dyn EmbeddingClient,
    config: RetrievalConfig,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(store: &'a Store, vector_index: &'a VectorIndex, embedder: &'a dyn EmbeddingClient) -> Self {
        Self {
            store,
            vector_index,
            embedder,
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    fn select_strategy(&self, query: &str, force_parallel: bool) -> Strategy {
        if force_parallel {
            return Strategy::Parallel;
        }
        if !self.config.smart_selection {
            return self.config.fallback_strategy;
        }
        let entity_words = extract_entity_words(query, &self.config);
        if entity_words.is_empty() {
            Strategy::VectorPrimary
        } else {
            Strategy::FtsPrimary
        }
    }

    /// Run the full pipeline: strategy selection, retrieval, rerank,
    /// threshold gating, limit.
    pub fn retrieve(&self, query: &str, force_parallel: bool) -> Result<RetrievalResult> {
        let time_window = infer_time_window(query, &self.config);
        let strategy = self.select_strategy(query, force_parallel);

        let mut fts_hits: Vec<(String, f32)> = Vec::new();
        let mut vector_hits: Vec<(String, f32)> = Vec::new();

        if matches!(strategy, Strategy::FtsPrimary | Strategy::Parallel) {
            fts_hits = self.store.fts_search(query, self.config.fts_top_k, time_window)?;
        }

        if matches!(strategy, Strategy::VectorPrimary | Strategy::Parallel) && !self.vector_index.is_empty() {
            let query_vector = self.embedder.embed(query)?;
            vector_hits = self.vector_index.search(&query_vector, self.config.vector_top_k)?;

            if vector_hits.len() < self.config.min_vector_results {
                let backfill = self.store.fts_search(query, self.config.fts_top_k, time_window)?;
                vector_hits = union_max_score(&vector_hits, &backfill);
            }
        }

        let candidate_ids: Vec<(String, f32)> = match strategy {
            Strategy::Parallel => union_max_score(&fts_hits, &vector_hits),
            Strategy::FtsPrimary => fts_hits,
            Strategy::VectorPrimary => vector_hits,
        };

        let mut candidates = Vec::with_capacity(candidate_ids.len());
        for (id, similarity) in &candidate_ids {
            if let Some(memory) = self.store.get(id)? {
                candidates.push((memory, *similarity));
            }
        }

        let max_access_count = candidates.iter().map(|(m, _)| m.access_count).max().unwrap_or(0);

        let mut ranked: Vec<RankedMemory> = candidates
            .into_iter()
            .map(|(memory, similarity)| {
                let score = self.score(&memory, similarity, max_access_count);
                RankedMemory { memory, score }
            })
            .collect();

        ranked.retain(|r| r.score.final_score >= self.config.similarity_threshold);

        ranked.sort_by(|a, b| {
            b.score
                .final_score
                .partial_cmp(&a.score.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.memory.importance.partial_cmp(&a.memory.importance).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });

        ranked.truncate(self.config.final_top_k);
        let no_relevant_memory = ranked.is_empty();

        Ok(RetrievalResult {
            matches: ranked,
            strategy_used: strategy,
            no_relevant_memory,
        })
    }

    fn score(&self, memory: &Memory, similarity: f32, max_access_count: i64) -> ScoreBreakdown {
        let similarity = similarity.clamp(0.0, 1.0);

        let age_days = (Utc::now() - memory.created_at).num_seconds() as f32 / 86_400.0;
        let recency = (-age_days.max(0.0) / self.config.recency_decay_days).exp().clamp(0.0, 1.0);

        let importance = (memory.importance * memory.decay_factor).clamp(0.0, 1.0);

        let frequency = if max_access_count <= 0 {
            0.0
        } else {
            (((1.0 + memory.access_count as f32).ln()) / ((1.0 + max_access_count as f32).ln())).clamp(0.0, 1.0)
        };

        let final_score = self.config.weight_similarity * similarity
            + self.config.weight_recency * recency
            + self.config.weight_importance * importance
            + self.config.weight_frequency * frequency;

        ScoreBreakdown {
            similarity,
            recency,
            importance,
            frequency,
            final_score: final_score.clamp(0.0, 1.0),
        }
    }
}

/// Union two `(id, score)` lists, keeping the larger score per id.
/// Deterministic: iterates the first list, then the second, with a
/// `BTreeMap`-style stable merge rather than a bare `HashMap` so output
/// order doesn't depend on hash seed.
fn union_max_score(a: &[(String, f32)], b: &[(String, f32)]) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (id, score) in a.iter().chain(b.iter()) {
        match scores.get_mut(id) {
            Some(existing) => {
                if *score > *existing {
                    *existing = *score;
                }
            }
            None => {
                scores.insert(id.clone(), *score);
                order.push(id.clone());
            }
        }
    }

    order.into_iter().map(|id| { let score = scores[&id]; (id, score) }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingClient;
    use crate::model::MemoryKind;

    fn setup() -> (Store, VectorIndex, MockEmbeddingClient) {
        let store = Store::open_in_memory().unwrap();
        let index = VectorIndex::with_config(crate::search::vector::VectorIndexConfig {
            dimensions: 32,
            ..Default::default()
        })
        .unwrap();
        let embedder = MockEmbeddingClient::new(32);
        (store, index, embedder)
    }

    #[test]
    fn fts_primary_returns_matching_memory_for_entity_query() {
        let (store, index, embedder) = setup();
        store.insert(Memory::new("the cat sat on the mat", MemoryKind::Fact, 0.9)).unwrap();
        let retriever = HybridRetriever::new(&store, &index, &embedder)
            .with_config(RetrievalConfig { similarity_threshold: 0.0, ..Default::default() });

        let result = retriever.retrieve("tell me about the cat", false).unwrap();
        assert_eq!(result.strategy_used, Strategy::FtsPrimary);
        assert!(!result.no_relevant_memory);
        assert!(result.matches.iter().any(|r| r.memory.content.contains("cat")));
    }

    #[test]
    fn empty_store_yields_no_relevant_memory() {
        let (store, index, embedder) = setup();
        let retriever = HybridRetriever::new(&store, &index, &embedder);
        let result = retriever.retrieve("what do you remember about dolphins", false).unwrap();
        assert!(result.no_relevant_memory);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn threshold_gating_discards_weak_candidates() {
        let (store, index, embedder) = setup();
        store.insert(Memory::new("unrelated filler text entry", MemoryKind::Fact, 0.1)).unwrap();
        let retriever = HybridRetriever::new(&store, &index, &embedder)
            .with_config(RetrievalConfig { similarity_threshold: 0.99, ..Default::default() });
        let result = retriever.retrieve("unrelated filler", false).unwrap();
        assert!(result.no_relevant_memory);
    }

    #[test]
    fn union_keeps_max_score_per_id() {
        let a = vec![("mem-1".to_string(), 0.5)];
        let b = vec![("mem-1".to_string(), 0.9), ("mem-2".to_string(), 0.3)];
        let merged = union_max_score(&a, &b);
        let mem1 = merged.iter().find(|(id, _)| id == "mem-1").unwrap();
        assert_eq!(mem1.1, 0.9);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn no_entity_words_selects_vector_primary() {
        let (store, index, embedder) = setup();
        let retriever = HybridRetriever::new(&store, &index, &embedder);
        let strategy = retriever.select_strategy("what is it", false);
        assert_eq!(strategy, Strategy::VectorPrimary);
    }

    #[test]
    fn forced_parallel_overrides_selection() {
        let (store, index, embedder) = setup();
        let retriever = HybridRetriever::new(&store, &index, &embedder);
        let strategy = retriever.select_strategy("tell me about cats", true);
        assert_eq!(strategy, Strategy::Parallel);
    }
}
