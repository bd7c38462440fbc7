//! HTTP and websocket transport for maitre.
//!
//! Exposes the chat orchestrator over `POST /api/chat` and `GET /ws/{session_id}`,
//! plus health and session management endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
