//! Session state storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::state::ConversationState;

/// Keyed storage for conversation state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<ConversationState>;

    async fn put(&self, session_id: &str, state: ConversationState);

    /// Remove a session. Returns `false` if it did not exist.
    async fn delete(&self, session_id: &str) -> bool;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-local session map. Sessions live until deleted or the process
/// exits; there is no expiry or size bound.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<ConversationState> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn put(&self, session_id: &str, state: ConversationState) {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), state);
    }

    async fn delete(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
