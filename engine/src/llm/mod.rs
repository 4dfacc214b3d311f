//! Inference Provider Abstraction Layer
//!
//! The hosted model is an external collaborator: the engine builds a request
//! (system prompt, recent context, the new user message) and reads back a
//! single `response` string. The `InferenceProvider` trait hides which
//! service actually runs the model.
//!
//! Calls are single best-effort attempts. Providers never retry.

use async_trait::async_trait;
use sdk::types::{Turn, TurnRole};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod workers_ai;

/// Reply used when the model returns no `response` field
pub const FALLBACK_RESPONSE: &str = "I'm having trouble generating a response. Please try again.";

/// Result type for inference operations
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Errors that can occur during an inference call
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<InferenceError> for sdk::EngineError {
    fn from(err: InferenceError) -> Self {
        sdk::EngineError::Inference(err.to_string())
    }
}

/// Role of a message sent to the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for ChatRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => ChatRole::User,
            TurnRole::Assistant => ChatRole::Assistant,
        }
    }
}

/// A `{role, content}` message in an inference request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.into(),
            content: turn.content.clone(),
        }
    }
}

/// Request body of an inference call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InferenceRequest {
    /// Model id, e.g. `@cf/meta/llama-3.3-70b-instruct-fp8-fast`
    #[serde(skip)]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response of an inference call
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct InferenceResponse {
    #[serde(default)]
    pub response: Option<String>,
}

impl InferenceResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// The reply text, or the fixed fallback when the model returned none
    pub fn text_or_fallback(self) -> String {
        match self.response {
            Some(text) => text,
            None => {
                tracing::warn!("Inference response had no text, using fallback reply");
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}

/// Inference provider trait that all backends implement
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "workers_ai", "ollama")
    fn name(&self) -> &str;

    /// Run the model once
    ///
    /// # Returns
    /// * `Ok(InferenceResponse)` - The raw response; `response` may be absent
    /// * `Err(InferenceError)` - If the call fails
    async fn run(&self, request: &InferenceRequest) -> Result<InferenceResponse>;

    /// Check if the provider is currently reachable
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Map a transport failure onto the error taxonomy
pub(crate) fn map_transport_error(err: reqwest::Error, base_url: &str) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else if err.is_connect() {
        InferenceError::ProviderUnavailable(format!("Cannot connect to {}", base_url))
    } else {
        InferenceError::NetworkError(err.to_string())
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub(crate) fn map_status_error(status: reqwest::StatusCode, body: String) -> InferenceError {
    match status.as_u16() {
        401 | 403 => InferenceError::AuthenticationFailed(body),
        429 => InferenceError::RateLimitExceeded,
        400..=499 => InferenceError::InvalidRequest(body),
        _ => InferenceError::ProviderUnavailable(format!("API error ({}): {}", status, body)),
    }
}
