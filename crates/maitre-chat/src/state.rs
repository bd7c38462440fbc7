use serde::Serialize;

use maitre_booking::OperationEnvelope;
use maitre_core::types::{Entities, Intent, Role, TurnMessage};

/// Everything remembered about one chat session.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub session_id: String,
    pub messages: Vec<TurnMessage>,
    /// Reference of the booking the guest is working with. Set by a
    /// successful create, cleared by a successful cancel; used when a turn
    /// does not name a reference itself.
    pub current_booking_reference: Option<String>,
    /// Intent extracted on the latest turn.
    pub intent: Option<Intent>,
    /// Entities extracted on the latest turn.
    pub entities: Entities,
    pub last_operation: Option<OperationEnvelope>,
    pub user_name: Option<String>,
    /// Booking fields accumulated across turns while a create is incomplete.
    pub pending_booking: Entities,
    /// Failure recorded by a step of the current turn, turned into an
    /// apology when the turn finishes.
    pub error: Option<String>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            current_booking_reference: None,
            intent: None,
            entities: Entities::default(),
            last_operation: None,
            user_name: None,
            pending_booking: Entities::default(),
            error: None,
        }
    }

    /// Content of the most recent assistant message.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn push_reply(&mut self, content: impl Into<String>) {
        self.messages.push(TurnMessage::assistant(content));
    }

    pub(crate) fn ends_with_reply(&self) -> bool {
        matches!(self.messages.last(), Some(m) if m.role == Role::Assistant)
    }
}
