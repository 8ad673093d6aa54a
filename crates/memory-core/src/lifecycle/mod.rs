//! Periodic and per-write memory bookkeeping (C5): importance scoring,
//! decay, dynamic-percentile archival, conflict detection, and daily
//! reflection generation.

mod conflict;

pub use conflict::StanceTriple;

use crate::config::LifecycleConfig;
use crate::llm::LlmClient;
use crate::model::{ConversationTurn, Memory, MemoryKind};
use crate::storage::Store;
use chrono::Utc;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

pub struct LifecycleManager {
    config: LifecycleConfig,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self { config: LifecycleConfig::default() }
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Importance assigned to a new memory. Keyword boosts are additive
    /// on top of the base score, capped at 0.95; `milestone` short-circuits
    /// straight to the cap.
    pub fn score_importance(&self, content: &str, milestone: bool, affinity_change: Option<i64>) -> f32 {
        if milestone {
            return self.config.milestone_importance;
        }

        let mut score = self.config.default_importance;

        if let Some(change) = affinity_change {
            if change.abs() >= self.config.affinity_shift_threshold {
                score = score.max(self.config.affinity_shift_importance);
            }
        }

        let lower = content.to_lowercase();
        if self.config.importance_keywords.iter().any(|kw| lower.contains(kw)) {
            score = score.max(self.config.keyword_importance);
        }

        score.min(0.95)
    }

    /// Multiply every active memory's decay factor by `decay_rate`.
    pub fn run_decay_tick(&self, store: &Store) -> Result<usize> {
        Ok(store.decay_tick(self.config.decay_rate)?)
    }

    /// `percentile(effective_importance, p)` across active, non-pinned
    /// memories, floored at `archive_floor`. Nearest-rank method.
    pub fn archive_threshold(&self, store: &Store) -> Result<f32> {
        let mut values: Vec<f32> = store
            .active_non_pinned()?
            .iter()
            .map(Memory::effective_importance)
            .collect();

        if values.is_empty() {
            return Ok(self.config.archive_floor);
        }

        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rank = ((self.config.archive_percentile / 100.0) * values.len() as f64).ceil() as usize;
        let index = rank.saturating_sub(1).min(values.len() - 1);

        Ok(values[index].max(self.config.archive_floor))
    }

    /// Archive every eligible memory and return the archived ids.
    /// Eligible: `effective_importance < threshold`, `access_count <
    /// archive_min_access_count`, `age > archive_min_age_days`, and not
    /// user-pinned (already excluded by `Store::active_non_pinned`).
    pub fn run_archival(&self, store: &Store) -> Result<Vec<String>> {
        let threshold = self.archive_threshold(store)?;
        let now = Utc::now();
        let mut archived = Vec::new();

        for memory in store.active_non_pinned()? {
            let age_days = (now - memory.created_at).num_days();
            if memory.effective_importance() < threshold
                && memory.access_count < self.config.archive_min_access_count
                && age_days > self.config.archive_min_age_days
            {
                store.archive(&memory.id)?;
                archived.push(memory.id);
            }
        }

        Ok(archived)
    }

    /// Compare `new_memory`'s stance triples against recent memories; on a
    /// contradicting stance over the same `(entity, object)`, flag both
    /// records and return a freshly-minted Reflection summarizing the
    /// shift (caller is responsible for persisting it).
    pub fn detect_conflicts(&self, store: &Store, new_memory: &Memory) -> Result<Vec<Memory>> {
        let new_triples = conflict::extract_stance_triples(&new_memory.content, &self.config.antonym_pairs);
        if new_triples.is_empty() {
            return Ok(Vec::new());
        }

        let window_start = Utc::now() - chrono::Duration::hours(self.config.conflict_window_hours);
        let mut reflections = Vec::new();

        for candidate in store.active_non_pinned()? {
            if candidate.id == new_memory.id || candidate.created_at < window_start {
                continue;
            }
            let prior_triples = conflict::extract_stance_triples(&candidate.content, &self.config.antonym_pairs);

            for new_triple in &new_triples {
                for prior_triple in &prior_triples {
                    if conflict::is_contradiction(new_triple, prior_triple, &self.config.antonym_pairs) {
                        store.set_conflict(&new_memory.id, true)?;
                        store.set_conflict(&candidate.id, true)?;

                        let summary = if conflict::contains_han(&new_triple.entity) || conflict::contains_han(&new_triple.object) {
                            format!(
                                "{}对{}的态度似乎从{}变成了{}。",
                                new_triple.entity, new_triple.object, prior_triple.stance, new_triple.stance
                            )
                        } else {
                            format!(
                                "{} appears to have shifted from {} to {} regarding {}.",
                                new_triple.entity, prior_triple.stance, new_triple.stance, new_triple.object
                            )
                        };
                        let mut reflection = Memory::new(summary, MemoryKind::Reflection, self.config.affinity_shift_importance);
                        reflection.metadata.insert(
                            "conflict_with".into(),
                            serde_json::json!([new_memory.id.clone(), candidate.id.clone()]),
                        );
                        reflections.push(reflection);
                    }
                }
            }
        }

        Ok(reflections)
    }

    /// Whether now is inside the configured reflection window: either
    /// the configured UTC hour, or the caller reports the user has been
    /// idle at least `reflection_idle_minutes`.
    pub fn should_reflect_now(&self, idle_minutes: i64) -> bool {
        let hour = Utc::now().format("%H").to_string().parse::<u32>().unwrap_or(0);
        hour == self.config.reflection_hour_utc || idle_minutes >= self.config.reflection_idle_minutes
    }

    /// Summarize a day's turns into a single Reflection memory via the
    /// LLM collaborator. Borrowed rather than owned so the same client
    /// backs both this and companion-runtime's tier-3 handler.
    pub fn generate_daily_reflection(&self, turns: &[ConversationTurn], llm: &dyn LlmClient) -> Result<Memory> {
        let transcript = turns
            .iter()
            .map(|t| format!("{:?}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Summarize the key events and emotional tone of today's conversation in 2-3 sentences:\n\n{transcript}"
        );
        let summary = llm.generate(&prompt)?;

        Ok(Memory::new(summary, MemoryKind::Reflection, self.config.reflection_importance))
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
