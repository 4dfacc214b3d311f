//! Ollama Provider
//!
//! Runs the conversation against a local Ollama instance, typically at
//! http://localhost:11434. Useful for development without a hosted account.
//!
//! Key features:
//! - Local execution (no API keys required)
//! - Non-streaming `/api/chat`
//! - `max_tokens` and `temperature` mapped to Ollama `options`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    map_transport_error, InferenceError, InferenceProvider, InferenceRequest, InferenceResponse,
    Result,
};

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "llama3.1:8b")
    model: String,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// The model configured here overrides the hosted model id in each request.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            model: model.into(),
            client,
        }
    }

    /// Convert an inference request to Ollama's chat format
    fn convert_request(&self, request: &InferenceRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|msg| OllamaMessage {
                    role: msg.role.to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl InferenceProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn run(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        let body = self.convert_request(request);

        tracing::debug!(
            "Ollama request: model={}, messages={}, total_chars={}",
            self.model,
            body.messages.len(),
            body.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let url = format!("{}/api/chat", self.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| match map_transport_error(e, &self.base_url) {
                InferenceError::ProviderUnavailable(_) => InferenceError::ProviderUnavailable(
                    format!("Cannot connect to Ollama at {}. Is Ollama running?", self.base_url),
                ),
                other => other,
            })?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::ProviderUnavailable(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        let response = ollama_response
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty());

        Ok(InferenceResponse { response })
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Ollama API request format
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama API response format
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}
