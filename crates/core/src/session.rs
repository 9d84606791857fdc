//! In-memory conversation store. Sessions live for the lifetime of the
//! process; nothing is written to disk.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::llm::{Message, Role};
use crate::modes::Mode;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub message_count: usize,
    pub total_tokens: u64,
    pub mode_history: Vec<Mode>,
}

#[derive(Clone, Debug)]
struct StoredMessage {
    message: Message,
    metadata: Option<Value>,
}

#[derive(Debug)]
struct Session {
    info: SessionInfo,
    messages: Vec<StoredMessage>,
}

impl Session {
    fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            info: SessionInfo {
                session_id: session_id.to_string(),
                created_at: now,
                last_active: now,
                message_count: 0,
                total_tokens: 0,
                mode_history: Vec::new(),
            },
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the session already existed.
    pub async fn create_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) {
            return false;
        }
        sessions.insert(session_id.to_string(), Session::new(session_id));
        true
    }

    /// Appends a turn, creating the session on first use. A numeric
    /// `tokens_used` field in `metadata` is added to the session total.
    pub async fn add_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        metadata: Option<Value>,
    ) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id));
        if let Some(tokens) = metadata
            .as_ref()
            .and_then(|m| m.get("tokens_used"))
            .and_then(Value::as_u64)
        {
            session.info.total_tokens = session.info.total_tokens.saturating_add(tokens);
        }
        session.messages.push(StoredMessage {
            message: Message {
                role,
                content: content.to_string(),
            },
            metadata,
        });
        session.info.message_count = session.messages.len();
        session.info.last_active = Utc::now();
        debug!(
            target: "core::session",
            "session={} role={} messages={}",
            session_id,
            role.as_str(),
            session.info.message_count
        );
    }

    /// Ordered turns of a session; empty for an unknown id.
    pub async fn get_conversation(&self, session_id: &str) -> Vec<Message> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.messages.iter().map(|m| m.message.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn get_session(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| s.info.clone())
    }

    /// Metadata attached to each turn, aligned with `get_conversation`.
    pub async fn get_metadata(&self, session_id: &str) -> Vec<Option<Value>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.messages.iter().map(|m| m.metadata.clone()).collect())
            .unwrap_or_default()
    }

    /// Notes that `mode` was used in this session; repeats are not recorded.
    pub async fn record_mode(&self, session_id: &str, mode: Mode) {
        let mut sessions = self.sessions.write().await;
        if let Some(s) = sessions.get_mut(session_id) {
            if !s.info.mode_history.contains(&mode) {
                s.info.mode_history.push(mode);
            }
        }
    }

    /// Drops the session entirely. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }
}
