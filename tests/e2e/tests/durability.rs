//! What survives a process restart: persisted memories always do; the
//! vectorize queue only survives past its last checkpoint.

use e2e_harness::TestEnvironment;
use memory_core::model::{MemoryKind, PendingVectorize};

#[test]
fn memories_and_checkpointed_queue_state_survive_a_restart() {
    let mut env = TestEnvironment::new_temp();
    let id = env.seed_memory("the user's favorite color is teal", MemoryKind::Fact, 0.6);
    env.queue.enqueue(PendingVectorize::new(id.clone(), "the user's favorite color is teal".into(), 0.6)).unwrap();
    env.checkpoint_queue();

    env.restart();

    let reopened = env.store.get(&id).unwrap();
    assert!(reopened.is_some(), "memories must survive a restart regardless of vectorization state");
    assert_eq!(env.queue.health().unwrap().pending_count, 1, "checkpointed queue state must survive a restart");

    let processed = env.drain_queue();
    assert_eq!(processed, 1);
    assert!(env.store.get(&id).unwrap().unwrap().vectorized);
}

#[test]
fn work_enqueued_after_the_last_checkpoint_is_lost_on_restart() {
    let mut env = TestEnvironment::new_temp();
    let id = env.seed_memory("a fact enqueued before checkpointing", MemoryKind::Fact, 0.5);
    env.queue.enqueue(PendingVectorize::new(id, "a fact enqueued before checkpointing".into(), 0.5)).unwrap();
    env.checkpoint_queue();

    let late_id = env.seed_memory("a fact enqueued after the checkpoint, simulating a mid-vectorize crash", MemoryKind::Fact, 0.5);
    env.queue
        .enqueue(PendingVectorize::new(late_id, "a fact enqueued after the checkpoint, simulating a mid-vectorize crash".into(), 0.5))
        .unwrap();
    assert_eq!(env.queue.health().unwrap().pending_count, 2);

    env.restart();

    assert_eq!(
        env.queue.health().unwrap().pending_count,
        1,
        "only the checkpointed half of the queue should come back after a crash"
    );
}
