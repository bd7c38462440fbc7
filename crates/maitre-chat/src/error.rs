//! Error types for the conversational layer.

use maitre_core::error::MaitreError;

use crate::turn::TurnPhase;

/// Failures talking to the language model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("extraction error: {0}")]
    Extraction(String),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("booking error: {0}")]
    Booking(String),
    #[error("invalid turn transition: {0} -> {1}")]
    InvalidTransition(TurnPhase, TurnPhase),
}

impl From<ChatError> for MaitreError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Llm(e) => MaitreError::Llm(e.to_string()),
            other => MaitreError::Chat(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::SessionNotFound("abc".into()).to_string(),
            "session not found: abc"
        );
        assert_eq!(
            ChatError::InvalidTransition(TurnPhase::Ingest, TurnPhase::Finalize).to_string(),
            "invalid turn transition: ingest -> finalize"
        );
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Provider {
            status: 404,
            body: "model 'llama9' not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "LLM provider returned 404: model 'llama9' not found"
        );
        let err: ChatError = LlmError::InvalidResponse("no message".into()).into();
        assert_eq!(err.to_string(), "LLM error: invalid LLM response: no message");
    }

    #[test]
    fn test_into_maitre_error() {
        let err: MaitreError = ChatError::EmptyMessage.into();
        assert!(matches!(err, MaitreError::Chat(_)));

        let err: MaitreError = ChatError::Llm(LlmError::InvalidResponse("x".into())).into();
        assert!(matches!(err, MaitreError::Llm(_)));
    }
}
