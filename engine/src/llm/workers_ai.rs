//! Workers AI Provider
//!
//! Runs hosted models through the Workers AI REST API:
//! `POST {base_url}/accounts/{account_id}/ai/run/{model}` with a bearer token.
//!
//! The API wraps the model output in an envelope
//! (`{"result": {"response": ...}, "success": true}`); only `response` is read.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{
    map_status_error, map_transport_error, InferenceError, InferenceProvider, InferenceRequest,
    InferenceResponse, Result,
};
use crate::config::WorkersAiConfig;
use crate::secrets::SecretString;

/// Workers AI provider
#[derive(Debug, Clone)]
pub struct WorkersAiProvider {
    config: WorkersAiConfig,
    api_token: SecretString,
    client: Client,
}

impl WorkersAiProvider {
    /// Create a new Workers AI provider
    pub fn new(config: WorkersAiConfig, api_token: SecretString) -> Result<Self> {
        if config.account_id.trim().is_empty() {
            return Err(InferenceError::InvalidRequest(
                "Workers AI account_id is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        Ok(Self {
            config,
            api_token,
            client,
        })
    }

    fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id,
            model
        )
    }
}

#[async_trait]
impl InferenceProvider for WorkersAiProvider {
    fn name(&self) -> &str {
        "workers_ai"
    }

    async fn run(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        tracing::debug!(
            "Workers AI request: model={}, messages={}, total_chars={}",
            request.model,
            request.messages.len(),
            request
                .messages
                .iter()
                .map(|m| m.content.len())
                .sum::<usize>()
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.run_url(&request.model))
            .bearer_auth(self.api_token.unsecure())
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, &self.config.base_url))?;

        tracing::info!(
            "Workers AI response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, text));
        }

        let envelope: WorkersAiEnvelope = response
            .json()
            .await
            .map_err(|e| InferenceError::ParseError(format!("Failed to parse Workers AI response: {}", e)))?;

        if !envelope.success.unwrap_or(true) {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(InferenceError::ProviderUnavailable(messages.join("; ")));
        }

        let response = envelope
            .result
            .and_then(|r| r.response)
            .or(envelope.response);

        Ok(InferenceResponse { response })
    }
}

/// Workers AI response envelope
#[derive(Debug, Deserialize)]
struct WorkersAiEnvelope {
    #[serde(default)]
    result: Option<WorkersAiResult>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<WorkersAiMessage>,
}

#[derive(Debug, Deserialize)]
struct WorkersAiResult {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkersAiMessage {
    #[serde(default)]
    message: String,
}
