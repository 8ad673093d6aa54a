//! Pure-rule classification of an interaction into a scene, tier, and
//! memory-retrieval policy.

use serde::{Deserialize, Serialize};

use crate::config::{RuntimeConfig, SceneRule};

/// Where an interaction originated. Drives both scene classification
/// and the memory-write policy in the unified context manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionSource {
    ChatInput,
    ToolResult,
    PluginAction,
    SystemEvent,
    GameInteraction,
    PassiveTrigger,
}

/// A classified interaction's weight class and default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneType {
    Simple,
    Medium,
    Complex,
}

/// How much long-term memory a scene pulls in before generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryRetrieval {
    None,
    FactsSummary,
    Full,
}

/// Raw inbound request handed to the classifier (and, unmodified, on
/// through the pipeline as the `InteractionContext`'s request snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub source: InteractionSource,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// The classifier's verdict: which scene this is, how heavy it is, and
/// what tier/memory/timeout the rest of the pipeline should use unless
/// a scene-specific override table says otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDecision {
    pub scene_id: String,
    pub scene_type: SceneType,
    pub default_tier: u8,
    pub memory_retrieval: MemoryRetrieval,
    pub timeout_ms: u64,
}

const CLICK_DRAG_EVENTS: &[&str] = &["click", "drag", "hover", "release"];
const MEDIUM_EVENTS: &[&str] = &[
    "hourly_chime",
    "system_warning",
    "feed_response",
    "game_result",
    "weather_update",
];

pub struct SceneClassifier<'a> {
    config: &'a RuntimeConfig,
}

impl<'a> SceneClassifier<'a> {
    pub fn new(config: &'a RuntimeConfig) -> Self {
        Self { config }
    }

    /// Classifies by scene id first if the deployment configured an
    /// override for it, then falls through to the three ordered rules.
    pub fn classify(&self, request: &InteractionRequest) -> SceneDecision {
        let scene_id = request.event_type.clone();

        if let Some(rule) = self.config.scene_tier_mapping.get(&scene_id) {
            return SceneDecision {
                scene_id,
                scene_type: rule.scene_type,
                default_tier: rule.default_tier,
                memory_retrieval: rule.memory_retrieval,
                timeout_ms: rule.timeout_ms,
            };
        }

        let rule = self.default_rule_for(request);
        SceneDecision {
            scene_id,
            scene_type: rule.scene_type,
            default_tier: rule.default_tier,
            memory_retrieval: rule.memory_retrieval,
            timeout_ms: rule.timeout_ms,
        }
    }

    fn default_rule_for(&self, request: &InteractionRequest) -> SceneRule {
        if request.source == InteractionSource::PassiveTrigger
            || CLICK_DRAG_EVENTS.contains(&request.event_type.as_str())
        {
            return SceneRule {
                scene_type: SceneType::Simple,
                default_tier: 1,
                memory_retrieval: MemoryRetrieval::None,
                timeout_ms: 50,
            };
        }

        if MEDIUM_EVENTS.contains(&request.event_type.as_str()) {
            return SceneRule {
                scene_type: SceneType::Medium,
                default_tier: 2,
                memory_retrieval: MemoryRetrieval::FactsSummary,
                timeout_ms: 100,
            };
        }

        SceneRule {
            scene_type: SceneType::Complex,
            default_tier: 3,
            memory_retrieval: MemoryRetrieval::Full,
            timeout_ms: 3_000,
        }
    }
}
