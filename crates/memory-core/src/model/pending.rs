//! Snapshot enqueued for background embedding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A memory waiting to be embedded and added to the vector index.
///
/// Copy-by-value: the queue does not pin the originating [`crate::Memory`]
/// row, it only holds the fields needed to call the embedding client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVectorize {
    pub memory_id: String,
    pub content: String,
    pub importance: f32,
    pub retry_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingVectorize {
    pub fn new(memory_id: impl Into<String>, content: impl Into<String>, importance: f32) -> Self {
        Self {
            memory_id: memory_id.into(),
            content: content.into(),
            importance,
            retry_count: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// High-priority lane membership.
    pub fn is_high_priority(&self) -> bool {
        self.importance >= 0.7
    }
}
