//! Phases of a single conversation turn with validated transitions.
//!
//! Ingest -> ExtractIntent -> Route -> Operation/OpenConversation -> Finalize
//! Route -> Finalize (nothing to do but respond)

use std::fmt;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    Ingest,
    ExtractIntent,
    Route,
    Operation,
    OpenConversation,
    Finalize,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Ingest => "ingest",
            TurnPhase::ExtractIntent => "extract_intent",
            TurnPhase::Route => "route",
            TurnPhase::Operation => "operation",
            TurnPhase::OpenConversation => "open_conversation",
            TurnPhase::Finalize => "finalize",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that a phase transition is allowed.
pub fn validate_transition(from: TurnPhase, to: TurnPhase) -> Result<(), ChatError> {
    let valid = matches!(
        (from, to),
        (TurnPhase::Ingest, TurnPhase::ExtractIntent)
            | (TurnPhase::ExtractIntent, TurnPhase::Route)
            | (TurnPhase::Route, TurnPhase::Operation)
            | (TurnPhase::Route, TurnPhase::OpenConversation)
            | (TurnPhase::Route, TurnPhase::Finalize)
            | (TurnPhase::Operation, TurnPhase::Finalize)
            | (TurnPhase::OpenConversation, TurnPhase::Finalize)
    );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// Tracks the current phase of a turn in progress.
#[derive(Debug)]
pub struct TurnCursor {
    phase: TurnPhase,
}

impl Default for TurnCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnCursor {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Ingest,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Move to `to`, or fail without moving if the transition is not allowed.
    pub fn advance(&mut self, to: TurnPhase) -> Result<(), ChatError> {
        validate_transition(self.phase, to)?;
        tracing::trace!(from = %self.phase, to = %to, "Turn phase");
        self.phase = to;
        Ok(())
    }
}
