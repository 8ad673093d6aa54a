//! Tier 1: template lookup, payload substitution, and uniform random
//! variant selection with a short recency-avoidance window.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use memory_core::model::EmotionTag;
use rand::Rng;

use super::GeneratedResponse;

const RECENCY_WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct TemplateVariant {
    pub text: String,
    pub emotion_tag: EmotionTag,
    pub emotion_intensity: f32,
}

impl TemplateVariant {
    pub fn new(text: impl Into<String>, emotion_tag: EmotionTag, emotion_intensity: f32) -> Self {
        Self {
            text: text.into(),
            emotion_tag,
            emotion_intensity,
        }
    }
}

pub struct TemplateBank {
    variants: HashMap<String, Vec<TemplateVariant>>,
    recently_used: Mutex<HashMap<String, VecDeque<usize>>>,
}

impl TemplateBank {
    pub fn new() -> Self {
        Self {
            variants: HashMap::new(),
            recently_used: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&mut self, scene_id: impl Into<String>, variants: Vec<TemplateVariant>) {
        self.variants.insert(scene_id.into(), variants);
    }

    /// Picks a variant not used in the last `RECENCY_WINDOW` picks for
    /// this scene (falling back to any variant once all are on cooldown),
    /// substitutes `{field}` placeholders from `payload`, and returns it.
    pub fn render(&self, scene_id: &str, payload: &serde_json::Value) -> Option<GeneratedResponse> {
        let variants = self.variants.get(scene_id)?;
        if variants.is_empty() {
            return None;
        }

        let index = self.pick_index(scene_id, variants.len());
        let variant = &variants[index];
        let text = substitute(&variant.text, payload);

        Some(GeneratedResponse {
            text,
            emotion_tag: variant.emotion_tag,
            emotion_intensity: variant.emotion_intensity,
            animation_hint: None,
            tier_used: 1,
        })
    }

    fn pick_index(&self, scene_id: &str, variant_count: usize) -> usize {
        let mut recently_used = self.recently_used.lock().expect("template recency lock poisoned");
        let history = recently_used.entry(scene_id.to_string()).or_default();

        let candidates: Vec<usize> = (0..variant_count).filter(|i| !history.contains(i)).collect();
        let chosen = if candidates.is_empty() {
            rand::rng().random_range(0..variant_count)
        } else {
            candidates[rand::rng().random_range(0..candidates.len())]
        };

        history.push_back(chosen);
        while history.len() > RECENCY_WINDOW {
            history.pop_front();
        }
        chosen
    }
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::new()
    }
}

fn substitute(template: &str, payload: &serde_json::Value) -> String {
    let mut result = template.to_string();
    if let Some(object) = payload.as_object() {
        for (key, value) in object {
            let placeholder = format!("{{{key}}}");
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }
    }
    result
}
