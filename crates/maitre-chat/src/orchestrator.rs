//! Chat orchestrator: validates messages and runs turns against stored
//! sessions, one turn at a time per session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::info;

use crate::error::ChatError;
use crate::executor::TurnExecutor;
use crate::prompts::NO_REPLY;
use crate::session::SessionStore;
use crate::state::ConversationState;

type SessionLock = Arc<tokio::sync::Mutex<()>>;

/// Result of handling one message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
}

pub struct ChatOrchestrator {
    executor: TurnExecutor,
    store: Arc<dyn SessionStore>,
    locks: Mutex<HashMap<String, SessionLock>>,
    max_message_length: usize,
}

impl ChatOrchestrator {
    pub fn new(
        executor: TurnExecutor,
        store: Arc<dyn SessionStore>,
        max_message_length: usize,
    ) -> Self {
        Self {
            executor,
            store,
            locks: Mutex::new(HashMap::new()),
            max_message_length,
        }
    }

    /// Handle an incoming chat message for `session_id`.
    ///
    /// Turns for the same session are serialized: the stored state is read,
    /// advanced and written back while holding that session's lock.
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<ChatReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let state = self.run_locked(message, session_id).await;
        let response = state.last_reply().unwrap_or(NO_REPLY).to_string();
        info!(
            session_id,
            intent = state.intent.map(|i| i.as_str()).unwrap_or("none"),
            "Handled chat message"
        );

        Ok(ChatReply {
            session_id: session_id.to_string(),
            response,
        })
    }

    async fn run_locked(&self, message: &str, session_id: &str) -> ConversationState {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let prior = self.store.get(session_id).await;
        let state = self.executor.process_message(message, session_id, prior).await;
        self.store.put(session_id, state.clone()).await;
        state
    }

    /// Current state of a session, if any.
    pub async fn session(&self, session_id: &str) -> Option<ConversationState> {
        self.store.get(session_id).await
    }

    /// Delete a session's state.
    ///
    /// Turns queued behind the delete keep the same lock, so they still run
    /// one at a time after it.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ChatError> {
        let lock = self.session_lock(session_id);
        let removed = {
            let _guard = lock.lock().await;
            let removed = self.store.delete(session_id).await;
            self.release_lock_if_idle(session_id, &lock);
            removed
        };

        if removed {
            info!(session_id, "Session cleared");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.to_string()))
        }
    }

    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }

    fn session_lock(&self, session_id: &str) -> SessionLock {
        self.lock_table()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the table entry when only the table and `held` reference it.
    /// Clones are only handed out under the table lock, so nobody can be
    /// waiting on a lock removed here.
    fn release_lock_if_idle(&self, session_id: &str, held: &SessionLock) {
        let mut table = self.lock_table();
        let idle = table
            .get(session_id)
            .is_some_and(|lock| Arc::ptr_eq(lock, held) && Arc::strong_count(held) == 2);
        if idle {
            table.remove(session_id);
        }
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionLock>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maitre_booking::{BookingService, MockReservationApi};

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use maitre_core::types::TurnMessage;

    use crate::error::LlmError;
    use crate::extractor::MockIntentExtractor;
    use crate::llm::{LanguageModel, MockLanguageModel};
    use crate::session::InMemorySessionStore;

    fn make_orchestrator() -> (ChatOrchestrator, Arc<MockIntentExtractor>, Arc<MockLanguageModel>) {
        let extractor = Arc::new(MockIntentExtractor::new());
        let llm = Arc::new(MockLanguageModel::new());
        let booking = BookingService::new(Arc::new(MockReservationApi::new()));
        let executor =
            TurnExecutor::new(extractor.clone(), llm.clone(), booking, "TheHungryUnicorn");
        let orchestrator =
            ChatOrchestrator::new(executor, Arc::new(InMemorySessionStore::new()), 50);
        (orchestrator, extractor, llm)
    }

    // ---- Validation ----

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (orch, _, _) = make_orchestrator();
        assert!(matches!(
            orch.handle_message("", "s1").await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(matches!(
            orch.handle_message("   \n", "s1").await,
            Err(ChatError::EmptyMessage)
        ));
        assert_eq!(orch.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_too_long_rejected() {
        let (orch, _, _) = make_orchestrator();
        let long = "x".repeat(51);
        assert!(matches!(
            orch.handle_message(&long, "s1").await,
            Err(ChatError::MessageTooLong(50))
        ));
        let exact = "x".repeat(50);
        assert!(orch.handle_message(&exact, "s1").await.is_ok());
    }

    // ---- Sessions ----

    #[tokio::test]
    async fn test_state_persists_between_turns() {
        let (orch, _, llm) = make_orchestrator();
        llm.push_reply("Hi there!");
        llm.push_reply("Sure.");

        let reply = orch.handle_message("hello", "s1").await.unwrap();
        assert_eq!(reply.response, "Hi there!");
        assert_eq!(reply.session_id, "s1");

        orch.handle_message("thanks", "s1").await.unwrap();
        let state = orch.session("s1").await.unwrap();
        assert_eq!(state.messages.len(), 4);
        assert_eq!(orch.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (orch, _, _) = make_orchestrator();
        orch.handle_message("hello", "s1").await.unwrap();

        orch.delete_session("s1").await.unwrap();
        assert!(orch.session("s1").await.is_none());
        assert!(matches!(
            orch.delete_session("s1").await,
            Err(ChatError::SessionNotFound(ref id)) if id == "s1"
        ));
    }

    /// Model that takes a while to answer and tracks how many calls overlap.
    #[derive(Default)]
    struct SlowModel {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn complete(&self, _messages: &[TurnMessage]) -> Result<String, LlmError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(150)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok("Noted.".to_string())
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_delete_keeps_queued_turns_serialized() {
        let llm = Arc::new(SlowModel::default());
        let booking = BookingService::new(Arc::new(MockReservationApi::new()));
        let executor = TurnExecutor::new(
            Arc::new(MockIntentExtractor::new()),
            llm.clone(),
            booking,
            "TheHungryUnicorn",
        );
        let orch = Arc::new(ChatOrchestrator::new(
            executor,
            Arc::new(InMemorySessionStore::new()),
            50,
        ));
        let pause = || tokio::time::sleep(Duration::from_millis(30));

        let first = tokio::spawn({
            let orch = orch.clone();
            async move { orch.handle_message("first", "s").await.unwrap() }
        });
        pause().await;
        let delete = tokio::spawn({
            let orch = orch.clone();
            async move { orch.delete_session("s").await }
        });
        pause().await;
        let queued = tokio::spawn({
            let orch = orch.clone();
            async move { orch.handle_message("queued", "s").await.unwrap() }
        });

        first.await.unwrap();
        delete.await.unwrap().unwrap();
        // "queued" now holds the session; a new turn must wait for it.
        let late = tokio::spawn({
            let orch = orch.clone();
            async move { orch.handle_message("late", "s").await.unwrap() }
        });
        queued.await.unwrap();
        late.await.unwrap();

        assert_eq!(llm.max_active.load(Ordering::SeqCst), 1);
        let state = orch.session("s").await.unwrap();
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[0].content, "queued");
        assert_eq!(state.messages[2].content, "late");
    }

    #[tokio::test]
    async fn test_delete_releases_idle_lock() {
        let (orch, _, _) = make_orchestrator();
        orch.handle_message("hello", "s1").await.unwrap();
        assert!(orch.lock_table().contains_key("s1"));

        orch.delete_session("s1").await.unwrap();
        assert!(!orch.lock_table().contains_key("s1"));
    }

    #[tokio::test]
    async fn test_concurrent_turns_same_session_serialized() {
        let (orch, _, _) = make_orchestrator();
        let orch = Arc::new(orch);

        let mut handles = Vec::new();
        for i in 0..8 {
            let orch = orch.clone();
            handles.push(tokio::spawn(async move {
                orch.handle_message(&format!("message {}", i), "shared")
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let state = orch.session("shared").await.unwrap();
        assert_eq!(state.messages.len(), 16);
    }
}
