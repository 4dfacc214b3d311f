//! Conversation state management
//!
//! Owns the shape of the per-user record: loading (with default fill and
//! migration of older documents), appending turns under the history cap,
//! folding trip and preference extraction into the record, and writing it
//! back in one piece.
//!
//! The manager holds no per-user state between calls. Every exchange is a
//! load, an in-memory mutation and a single persist.

pub mod exchange;

pub use exchange::{ChatReply, ExchangeService};

use crate::config::MemoryConfig;
use crate::extract::{extract_preferences, extract_trip};
use crate::store::{Result, UserStore};
use sdk::errors::EngineError;
use sdk::types::{Trip, Turn, TurnRole, UserRecord};
use serde_json::Value;
use std::sync::Arc;

/// Top-level fields of the current record format
const KNOWN_FIELDS: [&str; 3] = ["preferences", "conversationHistory", "savedTrips"];

/// Drop the oldest turns until at most `cap` remain
pub fn truncate_history(history: &mut Vec<Turn>, cap: usize) {
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

/// Decode a stored document into a record.
///
/// Missing fields take their defaults, unknown fields are dropped,
/// interests are deduplicated and an over-long history is cut back to
/// `history_cap`. Anything that is not a JSON object is corrupt.
pub fn decode_record(user_id: &str, value: Value, history_cap: usize) -> Result<UserRecord> {
    let Value::Object(fields) = &value else {
        return Err(EngineError::CorruptRecord(format!(
            "record for '{}' is not a JSON object",
            user_id
        )));
    };

    let legacy: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|key| !KNOWN_FIELDS.contains(key))
        .collect();
    if !legacy.is_empty() {
        tracing::warn!(
            "Dropping legacy fields from record '{}': {}",
            user_id,
            legacy.join(", ")
        );
    }

    let mut record: UserRecord = serde_json::from_value(value).map_err(|e| {
        EngineError::CorruptRecord(format!("record for '{}' does not decode: {}", user_id, e))
    })?;

    let interests = std::mem::take(&mut record.preferences.interests);
    for interest in interests {
        record.preferences.add_interest(interest);
    }

    if record.conversation_history.len() > history_cap {
        tracing::debug!(
            "Record '{}' holds {} turns, truncating to {}",
            user_id,
            record.conversation_history.len(),
            history_cap
        );
        truncate_history(&mut record.conversation_history, history_cap);
    }

    Ok(record)
}

/// Loads, mutates and persists user records
#[derive(Clone)]
pub struct ConversationStateManager {
    store: Arc<dyn UserStore>,
    max_history_turns: usize,
}

impl ConversationStateManager {
    pub fn new(store: Arc<dyn UserStore>, memory: &MemoryConfig) -> Self {
        Self {
            store,
            max_history_turns: memory.max_history_turns,
        }
    }

    pub fn max_history_turns(&self) -> usize {
        self.max_history_turns
    }

    /// The stored record for `user_id`, or the canonical empty record
    pub async fn load_or_default(&self, user_id: &str) -> Result<UserRecord> {
        match self.store.get(user_id).await? {
            Some(value) => {
                let record = decode_record(user_id, value, self.max_history_turns)?;
                tracing::debug!(
                    "Loaded record '{}': {} turns, {} trips",
                    user_id,
                    record.conversation_history.len(),
                    record.saved_trips.len()
                );
                Ok(record)
            }
            None => {
                tracing::debug!("No record for '{}', using defaults", user_id);
                Ok(UserRecord::default())
            }
        }
    }

    /// Append one turn, then enforce the history cap
    pub fn record_turn(
        &self,
        record: &mut UserRecord,
        role: TurnRole,
        content: impl Into<String>,
        timestamp: i64,
    ) {
        record
            .conversation_history
            .push(Turn::new(role, content, timestamp));
        truncate_history(&mut record.conversation_history, self.max_history_turns);
    }

    /// Append a user turn and an assistant turn, then enforce the cap once
    pub fn record_exchange(
        &self,
        record: &mut UserRecord,
        user_message: &str,
        assistant_reply: &str,
        timestamp: i64,
    ) {
        record.conversation_history.extend([
            Turn::new(TurnRole::User, user_message, timestamp),
            Turn::new(TurnRole::Assistant, assistant_reply, timestamp),
        ]);
        truncate_history(&mut record.conversation_history, self.max_history_turns);
    }

    /// Run trip extraction and, when a new trip is found, preference
    /// extraction over the user message.
    ///
    /// Returns the trip that was saved, if any.
    pub fn integrate_exchange(
        &self,
        record: &mut UserRecord,
        user_message: &str,
        assistant_reply: &str,
        timestamp: i64,
    ) -> Option<Trip> {
        let trip = extract_trip(
            user_message,
            assistant_reply,
            &record.saved_trips,
            timestamp,
        )?;

        tracing::info!("Saved trip to {} ({})", trip.destination, trip.duration);
        record.saved_trips.push(trip.clone());

        let update = extract_preferences(user_message);
        if !update.is_empty() {
            tracing::debug!("Preference update: {:?}", update);
            update.apply(&mut record.preferences);
        }

        Some(trip)
    }

    /// Append an exchange and fold extraction results into the record
    pub fn apply_exchange(
        &self,
        record: &mut UserRecord,
        user_message: &str,
        assistant_reply: &str,
        timestamp: i64,
    ) -> Option<Trip> {
        self.record_exchange(record, user_message, assistant_reply, timestamp);
        self.integrate_exchange(record, user_message, assistant_reply, timestamp)
    }

    /// Write the whole record back, replacing whatever was stored
    pub async fn persist(&self, user_id: &str, record: &UserRecord) -> Result<()> {
        let value = serde_json::to_value(record)
            .map_err(|e| EngineError::Store(format!("Failed to encode record: {}", e)))?;
        self.store.put(user_id, value).await?;

        tracing::debug!(
            "Persisted record '{}': {} turns, {} trips",
            user_id,
            record.conversation_history.len(),
            record.saved_trips.len()
        );
        Ok(())
    }
}
