use std::collections::HashMap;
use std::sync::Mutex;

use nova_core::types::{ChatMessage, SessionId};

/// In-process conversation history, keyed by session id.
///
/// Each completed turn appends exactly one (user, assistant) pair. History is
/// process-local; a restart starts every session fresh.
#[derive(Default)]
pub struct SessionHistory {
    sessions: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent `limit` messages for a session, oldest first.
    pub fn tail(&self, session_id: &SessionId, limit: usize) -> Vec<ChatMessage> {
        let sessions = self.lock();
        match sessions.get(&session_id.0) {
            Some(messages) => {
                let start = messages.len().saturating_sub(limit);
                messages[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Record one completed turn.
    pub fn append_turn(&self, session_id: &SessionId, user: ChatMessage, assistant: ChatMessage) {
        let mut sessions = self.lock();
        let messages = sessions.entry(session_id.0.clone()).or_default();
        messages.push(user);
        messages.push(assistant);
    }

    pub fn len(&self, session_id: &SessionId) -> usize {
        self.lock().get(&session_id.0).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<ChatMessage>>> {
        // A panic mid-append leaves at worst a lone user message; history is
        // advisory context, so recover rather than poison every later turn.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
