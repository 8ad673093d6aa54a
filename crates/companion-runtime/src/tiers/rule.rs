//! Tier 2: per-scene pure functions over context and state. No network,
//! no randomness beyond what the rule itself chooses to do.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use memory_core::model::{CompanionVitals, EmotionTag};

use super::GeneratedResponse;

/// Everything a rule function needs: the raw payload, the companion's
/// current vitals, the current time (for time-bucketed greetings), and a
/// running count of consecutive same-severity events (for escalation).
pub struct RuleContext {
    pub payload: serde_json::Value,
    pub vitals: CompanionVitals,
    pub now: DateTime<Utc>,
    pub repeat_count: u32,
}

type RuleFn = Box<dyn Fn(&RuleContext) -> (String, EmotionTag, f32) + Send + Sync>;

pub struct RuleRegistry {
    rules: HashMap<String, RuleFn>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        let mut registry = Self { rules: HashMap::new() };
        registry.register("hourly_chime", Box::new(hourly_chime));
        registry.register("system_warning", Box::new(system_warning));
        registry
    }

    pub fn register(&mut self, scene_id: impl Into<String>, rule: RuleFn) {
        self.rules.insert(scene_id.into(), rule);
    }

    pub fn evaluate(&self, scene_id: &str, context: &RuleContext) -> Option<GeneratedResponse> {
        let rule = self.rules.get(scene_id)?;
        let (text, emotion_tag, emotion_intensity) = rule(context);
        Some(GeneratedResponse {
            text,
            emotion_tag,
            emotion_intensity,
            animation_hint: None,
            tier_used: 2,
        })
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn hourly_chime(context: &RuleContext) -> (String, EmotionTag, f32) {
    let hour = context.now.format("%H").to_string().parse::<u32>().unwrap_or(12);
    let text = match hour {
        5..=11 => "Good morning! Another hour's gone by.",
        12..=17 => "Afternoon check-in, right on schedule.",
        18..=21 => "Evening already. Time flies.",
        _ => "It's quiet at this hour.",
    };
    (text.to_string(), EmotionTag::Neutral, 0.5)
}

fn system_warning(context: &RuleContext) -> (String, EmotionTag, f32) {
    let severity = (0.4 + context.repeat_count as f32 * 0.15).clamp(0.4, 0.95);
    let text = if context.repeat_count == 0 {
        "Something needs attention."
    } else {
        "This keeps happening. It really needs attention now."
    };
    (text.to_string(), EmotionTag::Anxious, severity)
}
