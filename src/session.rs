use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Process-wide session_id → message log map. Append-only within a request,
/// insertion-ordered, and bounded: beyond `max_messages` per session the
/// oldest messages are evicted on append.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Vec<SessionMessage>>>,
    max_messages: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_messages: config.max_messages.max(1),
        }
    }

    /// Create a new session and return its opaque id
    pub fn create(&self) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .insert(session_id.clone(), Vec::new());
        session_id
    }

    /// Append a message, auto-creating the session if unseen
    pub fn append(&self, session_id: &str, role: Role, content: &str) {
        let mut sessions = self.sessions.lock().expect("session map lock poisoned");
        let log = sessions.entry(session_id.to_string()).or_default();
        log.push(SessionMessage {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        if log.len() > self.max_messages {
            let excess = log.len() - self.max_messages;
            log.drain(..excess);
        }
    }

    /// Last `limit` messages in chronological order
    pub fn recent_history(&self, session_id: &str, limit: usize) -> Vec<SessionMessage> {
        let sessions = self.sessions.lock().expect("session map lock poisoned");
        match sessions.get(session_id) {
            Some(log) => {
                let start = log.len().saturating_sub(limit);
                log[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Recent history formatted for prompt inclusion
    pub fn history_text(&self, session_id: &str, limit: usize) -> String {
        self.recent_history(session_id, limit)
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::User => "Human",
                    Role::Assistant => "Assistant",
                };
                format!("{}: {}", speaker, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
