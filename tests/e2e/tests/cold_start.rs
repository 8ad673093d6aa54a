//! First-ever interaction against a brand-new, empty store: the
//! assistant must respond without fabricating any prior memory, and the
//! turn itself must land durably once the pipeline completes.

use e2e_harness::TestEnvironment;

#[tokio::test]
async fn first_chat_turn_responds_and_persists_without_prior_memory() {
    let env = TestEnvironment::new_temp().with_llm_text("Nice to meet you! [EMOTION:happy:0.7]");
    let ucm = env.ucm("session-cold-start");

    let request = env.chat("session-cold-start", "hi, this is the first time we've talked");
    let response = ucm.process_interaction(request).await.expect("interaction failed");

    assert!(response.success);
    assert!(!response.response_text.is_empty());
    assert!(response.trace_spans.iter().any(|s| s == "retrieved"));

    let stored = env.store.active_non_pinned().unwrap();
    assert_eq!(stored.len(), 1, "the first chat turn should persist exactly one memory");
    assert_eq!(env.queue.health().unwrap().pending_count, 1);
}

#[tokio::test]
async fn passive_triggers_never_persist_a_memory() {
    let env = TestEnvironment::new_temp();
    let ucm = env.ucm("session-cold-start");

    let request = env.passive("click");
    let response = ucm.process_interaction(request).await.expect("interaction failed");

    assert!(response.success);
    assert!(env.store.active_non_pinned().unwrap().is_empty(), "passive triggers write nothing");
    assert_eq!(env.queue.health().unwrap().pending_count, 0);
}
