//! Small data factories shared across scenario tests: long synthetic
//! conversation histories large enough to force prompt truncation.

use memory_core::model::{ConversationTurn, Role};

/// A long back-and-forth, padded so its token estimate comfortably
/// exceeds a `Lite` prompt budget on its own.
pub fn long_conversation(turns: usize, session_id: &str) -> Vec<ConversationTurn> {
    (0..turns)
        .map(|i| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            let content = format!("padding turn number {i} with several extra words to inflate the token estimate");
            ConversationTurn::new(role, content, session_id)
        })
        .collect()
}
