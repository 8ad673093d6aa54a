//! Cross-cutting properties that should hold regardless of which
//! specific scenario triggered an interaction.

use e2e_harness::TestEnvironment;
use companion_runtime::{InteractionRequest, InteractionSource};

#[tokio::test]
async fn the_emotion_marker_never_leaks_into_the_displayed_text() {
    let env = TestEnvironment::new_temp().with_llm_text("here's the answer you wanted [EMOTION:excited:0.9]");
    let ucm = env.ucm("session-emotion");
    let request = env.chat("session-emotion", "what do you think");
    let response = ucm.process_interaction(request).await.unwrap();

    assert!(!response.response_text.contains("[EMOTION"));
    assert_eq!(response.emotion.tag, memory_core::model::EmotionTag::Excited);
    assert!((response.emotion.intensity - 0.9).abs() < f32::EPSILON);
}

#[tokio::test]
async fn write_level_by_source_matches_the_configured_persistence_policy() {
    let cases: &[(InteractionSource, bool)] = &[
        (InteractionSource::ChatInput, true),
        (InteractionSource::ToolResult, true),
        (InteractionSource::PluginAction, true),
        (InteractionSource::SystemEvent, true),
        (InteractionSource::GameInteraction, true),
        (InteractionSource::PassiveTrigger, false),
    ];

    for (source, should_persist) in cases {
        let env = TestEnvironment::new_temp();
        let ucm = env.ucm("session-write-level");
        let request = InteractionRequest {
            source: *source,
            event_type: "message".into(),
            payload: serde_json::json!({ "text": "a detail worth remembering maybe" }),
        };
        ucm.process_interaction(request).await.unwrap();

        let persisted = !env.store.active_non_pinned().unwrap().is_empty();
        assert_eq!(persisted, *should_persist, "unexpected persistence outcome for {source:?}");
    }
}

#[tokio::test]
async fn a_sustained_positive_streak_overrides_a_non_base_mood_state() {
    let env = TestEnvironment::new_temp().with_llm_text("wonderful news! [EMOTION:happy:0.9]");
    let ucm = env.ucm("session-streak");

    let mut last_state = None;
    for i in 0..4 {
        let request = env.chat("session-streak", &format!("great update number {i}"));
        let response = ucm.process_interaction(request).await.unwrap();
        last_state = response.state_changes;
    }

    assert_eq!(last_state, Some(companion_runtime::ucm::state::MoodState::Normal));
}

#[tokio::test]
async fn result_only_writes_persist_the_raw_payload_rather_than_generated_text() {
    let env = TestEnvironment::new_temp().with_llm_text("a narrated victory line [EMOTION:happy:0.5]");
    let ucm = env.ucm("session-result-only");
    let request = InteractionRequest {
        source: InteractionSource::GameInteraction,
        event_type: "game_result".into(),
        payload: serde_json::json!({ "outcome": "win", "score": 42 }),
    };
    ucm.process_interaction(request).await.unwrap();

    let stored = env.store.active_non_pinned().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].content.contains("\"score\":42"));
    assert!(!stored[0].content.contains("narrated victory line"));
}
