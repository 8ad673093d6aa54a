//! Assembles the final prompt string handed to Tier 3, honoring a
//! mode-selected token budget and the memory-index attention-
//! preservation strategy.

use chrono::Utc;
use memory_core::model::ConversationTurn;
use memory_core::search::RankedMemory;

use crate::config::{PromptBudget, PromptMode, RuntimeConfig};
use crate::working_memory::estimate_tokens;

/// Everything the assembler needs that isn't a tunable: identity text,
/// the live working-memory turns, environment facts, and retrieval
/// output for this call.
pub struct PromptInputs<'a> {
    pub identity: &'a str,
    pub working_memory: &'a [ConversationTurn],
    pub environment: &'a str,
    pub long_term_summary: &'a str,
    pub ranked_memories: &'a [RankedMemory],
    pub no_relevant_memory: bool,
}

pub struct PromptAssembler<'a> {
    config: &'a RuntimeConfig,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(config: &'a RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, mode: PromptMode, inputs: &PromptInputs) -> String {
        let budget = self.config.prompt_budget(mode);

        let identity_block = truncate_to_budget(inputs.identity, budget.identity);
        let environment_block = truncate_to_budget(inputs.environment, budget.environment);
        let long_term_block = self.long_term_block(&budget, inputs);
        let instructions_block = self.instructions_block(&budget);
        let footer = "Respond in character. End with an [EMOTION:<tag>:<intensity>] marker.";

        let mut working_turns: Vec<String> = inputs
            .working_memory
            .iter()
            .map(|t| format!("{:?}: {}", t.role, t.content))
            .collect();

        loop {
            let working_block = working_turns.join("\n");
            let assembled = compose(
                &identity_block,
                &working_block,
                &environment_block,
                &long_term_block,
                &instructions_block,
                footer,
            );

            if estimate_tokens(&assembled) <= budget.total() || working_turns.is_empty() {
                return assembled;
            }

            working_turns.remove(0);
        }
    }

    fn long_term_block(&self, budget: &PromptBudget, inputs: &PromptInputs) -> String {
        if inputs.no_relevant_memory {
            return self.config.no_relevant_memory_directive.clone();
        }

        let summary = truncate_to_budget(inputs.long_term_summary, budget.long_term_summary);

        let index_entries: Vec<String> = inputs
            .ranked_memories
            .iter()
            .take(self.config.memory_index_count)
            .map(|ranked| format_index_entry(ranked))
            .collect();
        let index_block = truncate_to_budget(&index_entries.join("\n"), budget.memory_index);

        let fulltext_entries: Vec<String> = inputs
            .ranked_memories
            .iter()
            .take(self.config.memory_fulltext_count)
            .map(|ranked| format!("#{}: {}", ranked.memory.id, ranked.memory.content))
            .collect();
        let fulltext_block = truncate_to_budget(&fulltext_entries.join("\n\n"), budget.memory_fulltext);

        format!("{summary}\n\n{index_block}\n\n{fulltext_block}")
    }

    fn instructions_block(&self, budget: &PromptBudget) -> String {
        let text = "You may emit [RECALL:#<id>] to request the full content of any indexed memory not yet expanded.";
        truncate_to_budget(text, budget.instructions)
    }
}

fn format_index_entry(ranked: &RankedMemory) -> String {
    let memory = &ranked.memory;
    let age = Utc::now().signed_duration_since(memory.created_at);
    let relative_time = relative_time_label(age.num_minutes());
    let summary: String = memory.content.chars().take(20).collect();
    let star = if memory.importance >= 0.8 { " \u{2b50}" } else { "" };
    format!(
        "#{} [{}] {} (importance {:.1}){}",
        memory.id, relative_time, summary, memory.importance, star
    )
}

fn relative_time_label(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

fn truncate_to_budget(text: &str, budget_tokens: usize) -> String {
    if estimate_tokens(text) <= budget_tokens {
        return text.to_string();
    }
    let char_budget = budget_tokens * 4;
    text.chars().take(char_budget).collect()
}

#[allow(clippy::too_many_arguments)]
fn compose(
    identity: &str,
    working: &str,
    environment: &str,
    long_term: &str,
    instructions: &str,
    footer: &str,
) -> String {
    format!(
        "{identity}\n\n[Working memory]\n{working}\n\n[Environment]\n{environment}\n\n[Long-term]\n{long_term}\n\n[Instructions]\n{instructions}\n\n{footer}"
    )
}
