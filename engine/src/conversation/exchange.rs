//! Exchange orchestration
//!
//! One exchange runs load, prompt, inference, append, extract, persist in
//! sequence. The record is only written after the model has answered, so a
//! failed inference call leaves the stored record untouched: the user turn
//! is never recorded without its assistant turn.
//!
//! Exchanges for the same user are not serialized. Two concurrent exchanges
//! both load the same record and the later persist wins.

use super::ConversationStateManager;
use crate::config::{InferenceConfig, MemoryConfig};
use crate::llm::{InferenceProvider, InferenceRequest};
use crate::prompt::PromptBuilder;
use crate::secrets::scrub;
use crate::store::{Result, UserStore};
use sdk::errors::EngineError;
use sdk::types::{Trip, UserRecord};
use serde::Serialize;
use std::sync::Arc;

/// Result of a successful chat exchange
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    /// The assistant reply (or the fixed fallback text)
    pub response: String,

    /// Trip extracted from this exchange, if it was new
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_trip: Option<Trip>,
}

/// Runs exchanges against a store and an inference provider
///
/// Only `chat` needs a provider; the record operations work without one.
#[derive(Clone)]
pub struct ExchangeService {
    state: ConversationStateManager,
    provider: Option<Arc<dyn InferenceProvider>>,
    prompt: PromptBuilder,
    inference: InferenceConfig,
}

impl ExchangeService {
    pub fn new(store: Arc<dyn UserStore>, inference: InferenceConfig, memory: &MemoryConfig) -> Self {
        Self {
            state: ConversationStateManager::new(store, memory),
            provider: None,
            prompt: PromptBuilder::new(memory),
            inference,
        }
    }

    /// Attach the provider used by `chat`
    pub fn with_provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn state(&self) -> &ConversationStateManager {
        &self.state
    }

    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    pub fn provider(&self) -> Option<&Arc<dyn InferenceProvider>> {
        self.provider.as_ref()
    }

    /// Run one chat exchange for `user_id`
    ///
    /// # Errors
    /// - `InvalidInput` for a blank user id or message (nothing is read or written)
    /// - `Store` / `CorruptRecord` when the record cannot be loaded or written
    /// - `Inference` when the model call fails (nothing is written)
    /// - `Config` when no provider is attached
    pub async fn chat(&self, user_id: &str, message: &str) -> Result<ChatReply> {
        require_user_id(user_id)?;
        require_text(message, "message")?;
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| EngineError::Config("No inference provider configured".to_string()))?;

        let mut record = self.state.load_or_default(user_id).await?;

        let request = InferenceRequest {
            model: self.inference.model.clone(),
            messages: self.prompt.messages(&record, message),
            max_tokens: self.inference.max_tokens,
            temperature: self.inference.temperature,
        };

        let response = provider.run(&request).await.map_err(|e| {
            let reason = scrub(&e.to_string());
            tracing::warn!(
                "Inference via {} failed for '{}': {}",
                provider.name(),
                user_id,
                reason
            );
            EngineError::Inference(reason)
        })?;
        let reply = response.text_or_fallback();

        let timestamp = exchange_timestamp(&record);
        let saved_trip = self
            .state
            .apply_exchange(&mut record, message, &reply, timestamp);
        self.state.persist(user_id, &record).await?;

        tracing::info!(
            "Exchange completed for '{}' ({} chars reply, trip saved: {})",
            user_id,
            reply.len(),
            saved_trip.is_some()
        );

        Ok(ChatReply {
            response: reply,
            saved_trip,
        })
    }

    /// Record an exchange whose reply was produced elsewhere
    pub async fn save_exchange(
        &self,
        user_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<Option<Trip>> {
        require_user_id(user_id)?;
        require_text(user_message, "user message")?;
        require_text(assistant_message, "assistant message")?;

        let mut record = self.state.load_or_default(user_id).await?;
        let timestamp = exchange_timestamp(&record);
        let saved_trip =
            self.state
                .apply_exchange(&mut record, user_message, assistant_message, timestamp);
        self.state.persist(user_id, &record).await?;

        Ok(saved_trip)
    }

    /// Saved trips for a user; empty for users with no record
    pub async fn trips(&self, user_id: &str) -> Result<Vec<Trip>> {
        require_user_id(user_id)?;
        Ok(self.state.load_or_default(user_id).await?.saved_trips)
    }

    /// The full record for a user, or the default record
    pub async fn profile(&self, user_id: &str) -> Result<UserRecord> {
        require_user_id(user_id)?;
        self.state.load_or_default(user_id).await
    }

    /// The system prompt the next exchange for `user_id` would send
    pub async fn system_prompt(&self, user_id: &str) -> Result<String> {
        let record = self.profile(user_id).await?;
        Ok(self.prompt.build(&record))
    }
}

fn require_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(EngineError::InvalidInput("Missing userId".to_string()));
    }
    Ok(())
}

fn require_text(text: &str, what: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("Missing {}", what)));
    }
    Ok(())
}

/// Current time in milliseconds, kept strictly after the record's last turn
/// so trip ids derived from it stay unique within a record.
fn exchange_timestamp(record: &UserRecord) -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    match record.conversation_history.last() {
        Some(last) if last.timestamp >= now => last.timestamp + 1,
        _ => now,
    }
}
