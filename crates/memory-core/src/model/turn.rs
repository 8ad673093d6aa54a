//! Working-memory data types: conversation turns, session state, and the
//! periodic checkpoint of both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the rolling conversation buffer. Lives only in
/// WorkingMemory — not a [`crate::Memory`] until promoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
        }
    }
}

/// Snapshot of the companion's volatile state, carried inside
/// [`SessionState`]. Field set is the decision recorded in DESIGN.md.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionVitals {
    pub mood: f32,
    pub energy: f32,
    pub hunger: f32,
    pub affinity: f32,
    pub coins: i64,
}

impl Default for CompanionVitals {
    fn default() -> Self {
        Self {
            mood: 0.5,
            energy: 1.0,
            hunger: 0.0,
            affinity: 0.0,
            coins: 0,
        }
    }
}

/// In-memory session: a bounded buffer of turns plus the vitals snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
    pub vitals: CompanionVitals,
    pub schema_version: u32,
}

impl SessionState {
    pub const SCHEMA_VERSION: u32 = 1;

    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            started_at: now,
            last_interaction_at: now,
            turns: Vec::new(),
            vitals: CompanionVitals::default(),
            schema_version: Self::SCHEMA_VERSION,
        }
    }
}

/// Checkpoint of a [`SessionState`] plus an integrity hash, saved on state
/// change, end of turn, tool success, and a periodic 30s tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub session: SessionState,
    pub saved_at: DateTime<Utc>,
    pub content_hash: u64,
}

impl Checkpoint {
    pub fn new(session: SessionState) -> Self {
        let content_hash = Self::hash_of(&session);
        Self {
            session,
            saved_at: Utc::now(),
            content_hash,
        }
    }

    fn hash_of(session: &SessionState) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        session.session_id.hash(&mut hasher);
        session.turns.len().hash(&mut hasher);
        if let Some(last) = session.turns.last() {
            last.content.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Whether the checkpoint's hash still matches its own session data —
    /// used when falling back to the rolling backup if the primary file
    /// fails to parse.
    pub fn is_consistent(&self) -> bool {
        self.content_hash == Self::hash_of(&self.session)
    }
}
