//! Conversational layer for maitre.
//!
//! Turns a guest's message into at most one booking operation and a reply:
//! the model labels the utterance, a router picks the next step, and the
//! turn executor runs it against the booking service. Sessions are kept in
//! a [`SessionStore`] behind a [`ChatOrchestrator`].

pub mod error;
pub mod executor;
pub mod extractor;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod session;
pub mod state;
pub mod turn;

pub use error::{ChatError, LlmError};
pub use executor::TurnExecutor;
pub use extractor::{
    parse_extraction, Extraction, IntentExtractor, LlmIntentExtractor, MockIntentExtractor,
};
pub use llm::{LanguageModel, MockLanguageModel, OllamaClient};
pub use orchestrator::{ChatOrchestrator, ChatReply};
pub use router::{route, NextStep, Route};
pub use session::{InMemorySessionStore, SessionStore};
pub use state::ConversationState;
pub use turn::{TurnCursor, TurnPhase};
