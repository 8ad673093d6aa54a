//! Two store-level properties that hinge on timing rather than the
//! interaction pipeline: recall lags behind vectorization, and a
//! contradicting statement gets flagged rather than silently replacing
//! the prior one.

use e2e_harness::TestEnvironment;
use memory_core::lifecycle::LifecycleManager;
use memory_core::model::{Memory, MemoryKind};
use memory_core::search::HybridRetriever;

const QUERY: &str = "remember that afternoon we spent by the lake";

#[test]
fn recall_lags_until_the_background_queue_vectorizes_the_memory() {
    let mut env = TestEnvironment::new_temp();
    let id = env.seed_memory(QUERY, MemoryKind::Episode, 0.6);
    env.queue
        .enqueue(memory_core::model::PendingVectorize::new(id, QUERY.to_string(), 0.6))
        .unwrap();

    let before = HybridRetriever::new(&env.store, &env.index, &env.embedder).retrieve(QUERY, false).unwrap();
    assert!(before.no_relevant_memory, "a vector-primary query can't recall before the queue runs");

    let processed = env.drain_queue();
    assert_eq!(processed, 1);

    let after = HybridRetriever::new(&env.store, &env.index, &env.embedder).retrieve(QUERY, false).unwrap();
    assert!(!after.no_relevant_memory, "the same query should recall once the content is indexed");
}

#[test]
fn opposing_stances_on_the_same_topic_get_flagged_instead_of_silently_overwritten() {
    let env = TestEnvironment::new_temp();
    env.seed_memory("I like pizza.", MemoryKind::Fact, 0.5);

    let lifecycle = LifecycleManager::new();
    let new_memory = Memory::new("I dislike pizza.", MemoryKind::Fact, 0.5);
    let new_id = env.store.insert(new_memory.clone()).unwrap();
    let reflections = lifecycle.detect_conflicts(&env.store, &new_memory).unwrap();

    assert_eq!(reflections.len(), 1, "a clean antonym-pair contradiction should produce one reflection");
    assert!(reflections[0].content.contains("shifted"));

    let flagged_new = env.store.get(&new_id).unwrap().unwrap();
    assert!(flagged_new.conflict_flag, "the new statement should be flagged once a contradiction is detected");
    let prior = env.store.active_non_pinned().unwrap();
    let prior_fact = prior.iter().find(|m| m.id != new_id).unwrap();
    assert!(prior_fact.conflict_flag, "the prior statement should be flagged too");
}

#[test]
fn opposing_han_stances_on_the_same_topic_get_flagged_and_localized() {
    let env = TestEnvironment::new_temp();
    let old_id = env.seed_memory("海棠喜欢苹果", MemoryKind::Fact, 0.5);

    let lifecycle = LifecycleManager::new();
    let new_memory = Memory::new("海棠讨厌苹果", MemoryKind::Fact, 0.5);
    let new_id = env.store.insert(new_memory.clone()).unwrap();
    let reflections = lifecycle.detect_conflicts(&env.store, &new_memory).unwrap();

    assert_eq!(reflections.len(), 1, "an unsegmented Han contradiction should still produce one reflection");
    let reflection = &reflections[0];
    assert!(reflection.content.contains("海棠"));
    assert!(reflection.content.contains("苹果"));
    assert!(reflection.content.contains("态度"));

    let conflict_with = reflection.metadata.get("conflict_with").unwrap();
    assert_eq!(conflict_with, &serde_json::json!([new_id.clone(), old_id.clone()]));

    assert!(env.store.get(&new_id).unwrap().unwrap().conflict_flag);
    assert!(env.store.get(&old_id).unwrap().unwrap().conflict_flag);
}
