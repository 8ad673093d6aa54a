//! Bounded rolling buffer of conversation turns plus the active
//! `SessionState` snapshot.

use chrono::{DateTime, Utc};
use memory_core::model::{ConversationTurn, SessionState};

const DEFAULT_CAPACITY: usize = 20;
const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 120;

/// A rough chars/4 heuristic: close enough for budget arithmetic, not
/// meant to match any particular tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

pub struct WorkingMemory {
    capacity: usize,
    session_timeout_minutes: i64,
    state: SessionState,
}

impl WorkingMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            state: SessionState::new(session_id),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_session_timeout_minutes(mut self, minutes: i64) -> Self {
        self.session_timeout_minutes = minutes;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    /// Appends a turn, evicting the oldest if the buffer is at capacity.
    /// Starts a fresh session first if the idle gap exceeded the timeout.
    pub fn append(&mut self, turn: ConversationTurn) {
        if self.session_expired(turn.timestamp) {
            self.reset_with_session_id(self.state.session_id.clone());
        }

        self.state.last_interaction_at = turn.timestamp;
        self.state.turns.push(turn);
        while self.state.turns.len() > self.capacity {
            self.state.turns.remove(0);
        }
    }

    pub fn recent(&self, k: usize) -> &[ConversationTurn] {
        let len = self.state.turns.len();
        let start = len.saturating_sub(k);
        &self.state.turns[start..]
    }

    pub fn clear(&mut self) {
        self.state.turns.clear();
    }

    /// Starts a brand-new session under the same id, discarding turns and
    /// vitals continuity decisions to the caller (vitals are preserved;
    /// only the turn buffer and timestamps reset).
    pub fn reset_with_session_id(&mut self, session_id: impl Into<String>) {
        let vitals = self.state.vitals;
        self.state = SessionState::new(session_id);
        self.state.vitals = vitals;
    }

    fn session_expired(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.state.last_interaction_at);
        elapsed.num_minutes() > self.session_timeout_minutes
    }
}
