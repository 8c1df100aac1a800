//! In-memory chat session store.
//!
//! Sessions live for the process lifetime; nothing is persisted. Each
//! session owns an ordered list of turns behind its own async mutex, so
//! concurrent requests for the same session id cannot interleave their
//! read-modify-append and lose updates. A per-session turn cap bounds
//! memory growth; the oldest turns are dropped first.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::config::SESSION_TURN_CAP;

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

type Turns = Arc<Mutex<Vec<ChatTurn>>>;

/// Process-wide store of chat histories keyed by session id.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Turns>>>,
    turn_cap: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            turn_cap: SESSION_TURN_CAP,
        }
    }

    /// Create a store with a custom per-session cap (used in tests).
    pub fn with_turn_cap(turn_cap: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            turn_cap: turn_cap.max(2),
        }
    }

    async fn turns(&self, session_id: &str) -> Turns {
        if let Some(turns) = self.sessions.read().await.get(session_id) {
            return Arc::clone(turns);
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new()))),
        )
    }

    /// Snapshot of a session's history in chronological order.
    pub async fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        match self.sessions.read().await.get(session_id) {
            Some(turns) => turns.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Append one turn to a session.
    pub async fn append(&self, session_id: &str, turn: ChatTurn) {
        let turns = self.turns(session_id).await;
        let mut guard = turns.lock().await;
        guard.push(turn);
        let len = guard.len();
        if len > self.turn_cap {
            guard.drain(..len - self.turn_cap);
        }
    }

    /// Append a user/assistant pair atomically, keeping the pair adjacent
    /// even under concurrent sessions traffic.
    pub async fn append_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let turns = self.turns(session_id).await;
        let mut guard = turns.lock().await;
        guard.push(ChatTurn::user(question));
        guard.push(ChatTurn::assistant(answer));
        let len = guard.len();
        if len > self.turn_cap {
            guard.drain(..len - self.turn_cap);
        }
    }

    /// Number of known sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
