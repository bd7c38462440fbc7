//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use maitre_chat::{ChatOrchestrator, LanguageModel};

/// Shared application state, passed to handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Probed by the health endpoint.
    pub llm: Arc<dyn LanguageModel>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
    pub version: &'static str,
}

impl AppState {
    pub fn new(orchestrator: ChatOrchestrator, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            llm,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
