//! Three coordinated response producers (template, rule, LLM) plus the
//! fallback chain that walks down from whichever tier a scene selected.

pub mod llm;
pub mod rule;
pub mod template;

use std::time::Duration;

use memory_core::model::EmotionTag;

use crate::cache::ResponseCache;
use crate::llm::LlmClient;
use crate::prompt::PromptInputs;
use crate::scene::SceneDecision;
use rule::RuleContext;
use template::TemplateBank;

/// What every tier (and the fallback chain) ultimately produces.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedResponse {
    pub text: String,
    pub emotion_tag: EmotionTag,
    pub emotion_intensity: f32,
    pub animation_hint: Option<String>,
    pub tier_used: u8,
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    #[error("no template registered for scene {0}")]
    NoTemplate(String),
    #[error("no rule registered for scene {0}")]
    NoRule(String),
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),
}

pub type Result<T> = std::result::Result<T, TierError>;

/// Holds the tier-1 template bank and tier-2 rule registry. Tier 3 is a
/// free function in [`llm`] since it needs the caller's `PromptAssembler`
/// output and LLM client, not any state owned here.
pub struct TierHandlers {
    pub templates: TemplateBank,
    pub rules: rule::RuleRegistry,
}

impl TierHandlers {
    pub fn new() -> Self {
        Self {
            templates: TemplateBank::new(),
            rules: rule::RuleRegistry::new(),
        }
    }

    pub fn tier1(&self, scene_id: &str, payload: &serde_json::Value) -> Result<GeneratedResponse> {
        self.templates
            .render(scene_id, payload)
            .ok_or_else(|| TierError::NoTemplate(scene_id.to_string()))
    }

    pub fn tier2(&self, scene_id: &str, context: &RuleContext) -> Result<GeneratedResponse> {
        self.rules
            .evaluate(scene_id, context)
            .ok_or_else(|| TierError::NoRule(scene_id.to_string()))
    }

    pub async fn tier3(
        &self,
        client: &dyn LlmClient,
        inputs: &PromptInputs<'_>,
        config: &crate::config::RuntimeConfig,
        mode: crate::config::PromptMode,
    ) -> Result<GeneratedResponse> {
        llm::generate(client, inputs, config, mode).await.map_err(TierError::from)
    }
}

impl Default for TierHandlers {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-scene text used only when every other step in the chain failed.
fn emergency_text(scene_id: &str) -> GeneratedResponse {
    GeneratedResponse {
        text: format!("(the companion is momentarily unresponsive during {scene_id})"),
        emotion_tag: EmotionTag::Neutral,
        emotion_intensity: 0.3,
        animation_hint: None,
        tier_used: 0,
    }
}

/// Walks Response Cache → local LLM plugin → tier 2 → tier 1 → emergency
/// text, stopping at the first step that returns something. Each step is
/// independently optional; callers pass `None` to skip it.
#[allow(clippy::too_many_arguments)]
pub fn fallback_chain(
    handlers: &TierHandlers,
    scene: &SceneDecision,
    payload: &serde_json::Value,
    rule_context: Option<&RuleContext>,
    cache: Option<&ResponseCache>,
    local_llm_response: Option<GeneratedResponse>,
) -> GeneratedResponse {
    if let Some(cache) = cache {
        if let Some(cached) = cache.lookup(&scene.scene_id, payload) {
            return cached;
        }
    }

    if let Some(response) = local_llm_response {
        return response;
    }

    if let Some(context) = rule_context {
        if let Ok(response) = handlers.tier2(&scene.scene_id, context) {
            return response;
        }
    }

    if let Ok(response) = handlers.tier1(&scene.scene_id, payload) {
        return response;
    }

    emergency_text(&scene.scene_id)
}

pub const TIER1_DEADLINE: Duration = Duration::from_millis(50);
pub const TIER2_DEADLINE: Duration = Duration::from_millis(100);
