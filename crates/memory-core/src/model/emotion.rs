//! Emotion tags — the bounded `(category, intensity)` pair attached to
//! episodes and parsed out of LLM output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the nine valid emotion categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Happy,
    Excited,
    Sad,
    Angry,
    Shy,
    Surprised,
    Tired,
    Anxious,
    #[default]
    Neutral,
}

impl EmotionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionTag::Happy => "happy",
            EmotionTag::Excited => "excited",
            EmotionTag::Sad => "sad",
            EmotionTag::Angry => "angry",
            EmotionTag::Shy => "shy",
            EmotionTag::Surprised => "surprised",
            EmotionTag::Tired => "tired",
            EmotionTag::Anxious => "anxious",
            EmotionTag::Neutral => "neutral",
        }
    }
}

impl fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmotionTag {
    type Err = EmotionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "happy" => Ok(EmotionTag::Happy),
            "excited" => Ok(EmotionTag::Excited),
            "sad" => Ok(EmotionTag::Sad),
            "angry" => Ok(EmotionTag::Angry),
            "shy" => Ok(EmotionTag::Shy),
            "surprised" => Ok(EmotionTag::Surprised),
            "tired" => Ok(EmotionTag::Tired),
            "anxious" => Ok(EmotionTag::Anxious),
            "neutral" => Ok(EmotionTag::Neutral),
            other => Err(EmotionParseError::UnknownTag(other.to_string())),
        }
    }
}

/// Error parsing an emotion tag or intensity.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmotionParseError {
    #[error("unknown emotion tag: {0}")]
    UnknownTag(String),
    #[error("intensity out of range: {0}")]
    IntensityOutOfRange(f32),
}

/// A tag plus its intensity in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionValue {
    pub tag: EmotionTag,
    pub intensity: f32,
}

impl EmotionValue {
    pub fn new(tag: EmotionTag, intensity: f32) -> Result<Self, EmotionParseError> {
        if !(0.0..=1.0).contains(&intensity) {
            return Err(EmotionParseError::IntensityOutOfRange(intensity));
        }
        Ok(Self { tag, intensity })
    }

    pub fn neutral() -> Self {
        Self {
            tag: EmotionTag::Neutral,
            intensity: 0.5,
        }
    }
}
