//! Priority state machine over the companion's coarse mood state.
//!
//! Transitions follow a fixed priority order rather than free-form
//! emotion events: a higher-priority state can only be displaced by an
//! explicit override, and some base-state rules are never overridable.

use memory_core::model::{CompanionVitals, EmotionTag, EmotionValue};
use serde::{Deserialize, Serialize};

const LOW_ENERGY_THRESHOLD: f32 = 0.2;
const NIGHT_START_HOUR: u32 = 22;
const NIGHT_END_HOUR: u32 = 6;
const OVERRIDE_INTENSITY_THRESHOLD: f32 = 0.8;
const OVERRIDE_STREAK_THRESHOLD: u32 = 3;

/// States in descending priority order; `Sleeping` always wins, `Normal`
/// only applies when nothing else claims the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoodState {
    Sleeping,
    TiredLowEnergy,
    Anxious,
    Sad,
    TiredNight,
    Normal,
}

impl MoodState {
    fn priority(self) -> u8 {
        match self {
            MoodState::Sleeping => 0,
            MoodState::TiredLowEnergy => 1,
            MoodState::Anxious => 2,
            MoodState::Sad => 3,
            MoodState::TiredNight => 4,
            MoodState::Normal => 5,
        }
    }

    /// `energy < 20%` forcing `TiredLowEnergy` is a base-state rule, not
    /// an emotion-driven one, and cannot be overridden by any event.
    fn is_non_overridable(self) -> bool {
        matches!(self, MoodState::Sleeping | MoodState::TiredLowEnergy)
    }
}

/// Ways a caller can request a higher-priority state be displaced.
/// "Values restored by mechanical means" (feeding restores energy) are
/// deliberately not a variant here: they re-evaluate the base rules
/// instead of going through override gating.
#[derive(Debug, Clone, Copy)]
pub enum OverrideTrigger {
    HighIntensityEmotion(EmotionValue),
    ConsecutivePositiveStreak(u32),
    ExplicitComfortAction,
}

impl OverrideTrigger {
    fn authorizes_override(self) -> bool {
        match self {
            OverrideTrigger::HighIntensityEmotion(value) => {
                is_positive(value.tag) && value.intensity >= OVERRIDE_INTENSITY_THRESHOLD
            }
            OverrideTrigger::ConsecutivePositiveStreak(count) => count >= OVERRIDE_STREAK_THRESHOLD,
            OverrideTrigger::ExplicitComfortAction => true,
        }
    }
}

fn is_positive(tag: EmotionTag) -> bool {
    matches!(tag, EmotionTag::Happy | EmotionTag::Excited)
}

pub struct StateMachine {
    current: MoodState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self { current: MoodState::Normal }
    }

    pub fn current(&self) -> MoodState {
        self.current
    }

    /// Re-derives the base state from vitals and the hour of day, then
    /// applies an optional override if one was requested and authorized.
    pub fn transition(
        &mut self,
        vitals: &CompanionVitals,
        hour_of_day: u32,
        is_sleeping: bool,
        emotion: Option<EmotionValue>,
        override_trigger: Option<OverrideTrigger>,
    ) -> MoodState {
        let base = self.base_state(vitals, hour_of_day, is_sleeping, emotion);

        let next = match override_trigger {
            Some(trigger) if !base.is_non_overridable() && trigger.authorizes_override() => self.overridden_state(),
            _ => base,
        };

        self.current = next;
        next
    }

    fn base_state(&self, vitals: &CompanionVitals, hour_of_day: u32, is_sleeping: bool, emotion: Option<EmotionValue>) -> MoodState {
        if is_sleeping {
            return MoodState::Sleeping;
        }
        if vitals.energy < LOW_ENERGY_THRESHOLD {
            return MoodState::TiredLowEnergy;
        }
        if let Some(emotion) = emotion {
            if emotion.tag == EmotionTag::Anxious {
                return MoodState::Anxious;
            }
            if emotion.tag == EmotionTag::Sad {
                return MoodState::Sad;
            }
        }
        if hour_of_day >= NIGHT_START_HOUR || hour_of_day < NIGHT_END_HOUR {
            return MoodState::TiredNight;
        }
        MoodState::Normal
    }

    /// An authorized override always clears back to the baseline mood;
    /// there is no separate "elevated" state for it to land on yet.
    fn overridden_state(&self) -> MoodState {
        MoodState::Normal
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals_with_energy(energy: f32) -> CompanionVitals {
        CompanionVitals { energy, ..CompanionVitals::default() }
    }

    #[test]
    fn low_energy_forces_tired_and_cannot_be_overridden() {
        let mut machine = StateMachine::new();
        let state = machine.transition(
            &vitals_with_energy(0.1),
            14,
            false,
            None,
            Some(OverrideTrigger::ExplicitComfortAction),
        );
        assert_eq!(state, MoodState::TiredLowEnergy);
    }

    #[test]
    fn sleeping_outranks_everything() {
        let mut machine = StateMachine::new();
        let state = machine.transition(&CompanionVitals::default(), 14, true, None, None);
        assert_eq!(state, MoodState::Sleeping);
    }

    #[test]
    fn anxious_emotion_without_override_sets_anxious_state() {
        let mut machine = StateMachine::new();
        let anxious = EmotionValue::new(EmotionTag::Anxious, 0.6).unwrap();
        let state = machine.transition(&CompanionVitals::default(), 14, false, Some(anxious), None);
        assert_eq!(state, MoodState::Anxious);
    }

    #[test]
    fn high_intensity_positive_emotion_overrides_anxious() {
        let mut machine = StateMachine::new();
        let anxious = EmotionValue::new(EmotionTag::Anxious, 0.6).unwrap();
        let happy = EmotionValue::new(EmotionTag::Happy, 0.9).unwrap();
        let state = machine.transition(
            &CompanionVitals::default(),
            14,
            false,
            Some(anxious),
            Some(OverrideTrigger::HighIntensityEmotion(happy)),
        );
        assert_eq!(state, MoodState::Normal);
    }

    #[test]
    fn weak_override_trigger_does_not_authorize_a_change() {
        let mut machine = StateMachine::new();
        let anxious = EmotionValue::new(EmotionTag::Anxious, 0.6).unwrap();
        let weak_happy = EmotionValue::new(EmotionTag::Happy, 0.3).unwrap();
        let state = machine.transition(
            &CompanionVitals::default(),
            14,
            false,
            Some(anxious),
            Some(OverrideTrigger::HighIntensityEmotion(weak_happy)),
        );
        assert_eq!(state, MoodState::Anxious);
    }

    #[test]
    fn late_hour_defaults_to_tired_night_when_otherwise_normal() {
        let mut machine = StateMachine::new();
        let state = machine.transition(&CompanionVitals::default(), 23, false, None, None);
        assert_eq!(state, MoodState::TiredNight);
    }
}
