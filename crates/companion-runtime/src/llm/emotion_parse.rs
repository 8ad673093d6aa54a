//! Trailing `[EMOTION:<tag>:<intensity>]` wire format: regex-parsed and
//! stripped from Tier 3 output, with a rule-based fallback tagger for
//! when the model doesn't emit the marker at all.

use memory_core::model::{EmotionTag, EmotionValue};
use regex::Regex;
use std::sync::OnceLock;

fn emotion_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[EMOTION:(\w+):([\d.]+)\]\s*$").expect("static pattern is valid"))
}

/// Split `text` into `(display_text, emotion)`. On no match, missing
/// tag, or out-of-range intensity, falls back to [`fallback_tag`] over
/// the whole text rather than erroring — Tier 3 must always produce a
/// usable emotion.
pub fn parse_trailing_emotion(text: &str) -> (String, EmotionValue) {
    if let Some(caps) = emotion_regex().captures(text) {
        let tag_str = &caps[1];
        let intensity_str = &caps[2];

        if let (Ok(tag), Ok(intensity)) = (tag_str.parse::<EmotionTag>(), intensity_str.parse::<f32>()) {
            if let Ok(value) = EmotionValue::new(tag, intensity.clamp(0.0, 1.0)) {
                let stripped = emotion_regex().replace(text, "").trim_end().to_string();
                return (stripped, value);
            }
        }
    }

    (text.to_string(), fallback_tag(text))
}

/// Rule-based emotion guess when the model produced no parseable
/// marker: `!` nudges intensity up, `…`/`...` nudges it down, an emoji
/// nudges it up slightly; otherwise neutral at 0.5.
pub fn fallback_tag(text: &str) -> EmotionValue {
    let mut intensity: f32 = 0.5;

    if text.contains('!') {
        intensity += 0.2;
    }
    if text.contains('\u{2026}') || text.contains("...") {
        intensity -= 0.2;
    }
    if text.chars().any(|c| (c as u32) >= 0x1F300) {
        intensity += 0.1;
    }

    EmotionValue::new(EmotionTag::Neutral, intensity.clamp(0.0, 1.0)).expect("clamped into range")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_trailing_tag() {
        let (text, emotion) = parse_trailing_emotion("I'm so glad you're here! [EMOTION:happy:0.9]");
        assert_eq!(text, "I'm so glad you're here!");
        assert_eq!(emotion.tag, EmotionTag::Happy);
        assert_eq!(emotion.intensity, 0.9);
    }

    #[test]
    fn unparseable_tag_falls_back_to_rule_based() {
        let (text, emotion) = parse_trailing_emotion("wow!! [EMOTION:furious:2.0]");
        assert_eq!(text, "wow!! [EMOTION:furious:2.0]");
        assert_eq!(emotion.tag, EmotionTag::Neutral);
        assert!(emotion.intensity > 0.5);
    }

    #[test]
    fn missing_tag_falls_back_to_neutral_default() {
        let (text, emotion) = parse_trailing_emotion("just a plain sentence");
        assert_eq!(text, "just a plain sentence");
        assert_eq!(emotion.tag, EmotionTag::Neutral);
        assert_eq!(emotion.intensity, 0.5);
    }

    #[test]
    fn ellipsis_lowers_fallback_intensity() {
        let emotion = fallback_tag("I suppose so...");
        assert!(emotion.intensity < 0.5);
    }
}
