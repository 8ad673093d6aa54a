//! Memory model — core types shared by storage, search, and lifecycle.
//!
//! Memory is a tagged record (`MemoryKind` discriminator) with typed
//! projections over its `metadata` map rather than a class hierarchy.

mod emotion;
mod memory;
mod pending;
mod turn;

pub use emotion::{EmotionParseError, EmotionTag, EmotionValue};
pub use memory::{EpisodeView, FactView, Memory, MemoryKind, RelationView};
pub use pending::PendingVectorize;
pub use turn::{Checkpoint, CompanionVitals, ConversationTurn, Role, SessionState};

use std::collections::HashMap;

/// Opaque metadata bag attached to a [`Memory`]. Kept as a JSON-ish map
/// rather than a concrete struct per kind so new fields never require a
/// schema migration of the Rust type — only of whatever reads it.
pub type Metadata = HashMap<String, serde_json::Value>;
