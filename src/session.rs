//! Bounded per-session conversation memory

use std::collections::VecDeque;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use serde::Serialize;

use crate::models::Turn;

/// One session's conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub turns: VecDeque<Turn>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            turns: VecDeque::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    #[must_use]
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_active_at).to_std().unwrap_or_default()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrent store of bounded conversation logs, keyed by session id.
///
/// Each session's turn list is serialized through its map entry guard, so
/// concurrent appends to the same session cannot lose updates while sessions
/// stay independent of each other. Expiry is the caller's policy; the store
/// only exposes the eviction hooks.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_history: usize,
}

impl SessionStore {
    /// Create a store keeping at most `max_history` turns per session.
    ///
    /// A zero bound is clamped to 1 so every session retains at least its
    /// latest turn.
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_history: max_history.max(1),
        }
    }

    /// Append a turn, creating the session on first contact.
    ///
    /// Enforces the history bound inside the append: the oldest turn is
    /// evicted first once the bound would be exceeded, never the newest.
    /// The whole update happens under the session's entry guard, with no
    /// await points, so a cancelled caller either recorded the full turn or
    /// none of it.
    pub fn append_turn(&self, session_id: &str, turn: Turn) {
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(Session::new);

        while session.turns.len() >= self.max_history {
            session.turns.pop_front();
        }
        session.turns.push_back(turn);
        session.last_active_at = Utc::now();
    }

    /// The most recent `max_turns` turns, chronological (oldest first).
    ///
    /// Unknown sessions yield an empty history.
    #[must_use]
    pub fn recent_history(&self, session_id: &str, max_turns: usize) -> Vec<Turn> {
        self.sessions.get(session_id).map_or_else(Vec::new, |session| {
            let skip = session.turns.len().saturating_sub(max_turns);
            session.turns.iter().skip(skip).cloned().collect()
        })
    }

    /// Drop a session's turns but keep the session alive.
    pub fn clear(&self, session_id: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.turns.clear();
            session.last_active_at = Utc::now();
        }
    }

    /// Eviction hook: remove a session entirely. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Eviction hook: remove every session idle for longer than `max_idle`.
    /// Returns how many were removed.
    ///
    /// The idle check and the removal run under the same entry guard, so a
    /// session that takes a turn while the sweep is in flight is seen as
    /// active and kept, never removed on a stale reading.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut evicted = 0;
        self.sessions.retain(|session_id, session| {
            if session.idle_for(now) > max_idle {
                tracing::info!("Evicted idle session: {}", session_id);
                evicted += 1;
                return false;
            }
            true
        });
        evicted
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// How many turns a session currently holds (0 for unknown sessions).
    #[must_use]
    pub fn turn_count(&self, session_id: &str) -> usize {
        self.sessions
            .get(session_id)
            .map_or(0, |session| session.turns.len())
    }

    #[must_use]
    pub fn max_history(&self) -> usize {
        self.max_history
    }
}
