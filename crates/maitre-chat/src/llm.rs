//! Language model access.
//!
//! [`LanguageModel`] is a single non-streaming chat completion call.
//! [`OllamaClient`] implements it against Ollama's `/api/chat`;
//! [`MockLanguageModel`] replays scripted replies for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use maitre_core::config::LlmConfig;
use maitre_core::types::TurnMessage;

use crate::error::LlmError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a conversation, returning the assistant's text.
    async fn complete(&self, messages: &[TurnMessage]) -> Result<String, LlmError>;

    /// Whether the model endpoint is reachable.
    async fn is_available(&self) -> bool;
}

// =============================================================================
// Ollama
// =============================================================================

/// Ollama chat client.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        tracing::info!(model = %config.model, base_url = %config.base_url, "Initialized Ollama client");
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check whether the Ollama server answers `GET /api/tags`.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Ollama health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, messages: &[TurnMessage]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            tracing::error!(error = %e, "Error invoking Ollama");
            LlmError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Ollama returned an error");
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let reply: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        tracing::debug!(chars = reply.message.content.len(), "Ollama reply received");
        Ok(reply.message.content)
    }

    async fn is_available(&self) -> bool {
        self.check_health().await
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaReplyMessage {
    #[serde(default)]
    content: String,
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Scripted language model for tests.
///
/// Replies are consumed in order; once the script runs out every call
/// returns [`MockLanguageModel::DEFAULT_REPLY`]. Every request is recorded.
#[derive(Debug)]
pub struct MockLanguageModel {
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<TurnMessage>>>,
    available: AtomicBool,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    pub const DEFAULT_REPLY: &'static str = "How can I help you with your booking today?";

    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.script).push_back(Ok(reply.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back(Err(message.into()));
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Every message list passed to `complete`, oldest first.
    pub fn requests(&self) -> Vec<Vec<TurnMessage>> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, messages: &[TurnMessage]) -> Result<String, LlmError> {
        lock(&self.requests).push(messages.to_vec());
        match lock(&self.script).pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::InvalidResponse(message)),
            None => Ok(Self::DEFAULT_REPLY.to_string()),
        }
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}
