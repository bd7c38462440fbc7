//! Route handler functions for the chat transport.
//!
//! The REST and websocket adapters both delegate to the shared
//! [`ChatOrchestrator`](maitre_chat::ChatOrchestrator); neither holds any
//! conversation state of its own.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maitre_chat::ChatReply;

use crate::error::ApiError;
use crate::state::AppState;

const SERVICE_NAME: &str = "restaurant-booking-agent";
const WS_GREETING: &str = "Connected to restaurant booking assistant. How can I help you today?";
const WS_TYPING: &str = "Agent is typing...";
const WS_ERROR: &str = "I encountered an error processing your message. Please try again.";

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub llm_available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Kind of a server-to-client websocket frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    System,
    Typing,
    Response,
    Error,
}

/// Server-to-client websocket frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub content: String,
}

impl ServerFrame {
    fn new(kind: FrameKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Client-to-server websocket frame.
#[derive(Debug, Deserialize)]
struct ClientFrame {
    #[serde(default)]
    message: String,
}

// =============================================================================
// REST
// =============================================================================

/// POST /api/chat - run one turn.
///
/// A fresh session id is generated when the request carries none.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state
        .orchestrator
        .handle_message(&request.message, &session_id)
        .await?;
    Ok(Json(reply))
}

/// GET /api/health - service status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: state.version.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        llm_available: state.llm.is_available().await,
    })
}

/// GET /api/sessions - number of stored sessions.
pub async fn sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        active_sessions: state.orchestrator.session_count().await,
    })
}

/// DELETE /api/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.orchestrator.delete_session(&session_id).await?;
    Ok(Json(MessageResponse {
        message: format!("Session {} cleared", session_id),
    }))
}

// =============================================================================
// Websocket
// =============================================================================

/// GET /ws/{session_id} - duplex chat for one session.
pub async fn ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| chat_socket(socket, state, session_id))
}

async fn chat_socket(socket: WebSocket, state: AppState, session_id: String) {
    tracing::info!(session_id = %session_id, "WebSocket connection established");
    let (mut sender, mut receiver) = socket.split();

    if !send_frame(&mut sender, &ServerFrame::new(FrameKind::System, WS_GREETING)).await {
        return;
    }

    while let Some(incoming) = receiver.next().await {
        let text = match incoming {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "WebSocket receive failed");
                break;
            }
        };

        let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(frame) if frame.message.trim().is_empty() => continue,
            Ok(frame) => {
                tracing::info!(session_id = %session_id, "Received websocket message");
                if !send_frame(&mut sender, &ServerFrame::new(FrameKind::Typing, WS_TYPING)).await {
                    break;
                }
                match state
                    .orchestrator
                    .handle_message(&frame.message, &session_id)
                    .await
                {
                    Ok(reply) => ServerFrame::new(FrameKind::Response, reply.response),
                    Err(e) => {
                        tracing::error!(session_id = %session_id, error = %e, "Error processing message");
                        ServerFrame::new(FrameKind::Error, WS_ERROR)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Malformed websocket frame");
                ServerFrame::new(FrameKind::Error, WS_ERROR)
            }
        };

        if !send_frame(&mut sender, &reply).await {
            break;
        }
    }

    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}

/// Returns `false` once the client has gone away.
async fn send_frame<S>(sender: &mut S, frame: &ServerFrame) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    let Ok(json) = serde_json::to_string(frame) else {
        return false;
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}
