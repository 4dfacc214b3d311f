//! System prompt and context window construction
//!
//! The prompt is a fixed instructional template followed by two optional
//! blocks: the user's preferences and the most recent saved trips. Neither
//! block is emitted when its collection is empty.

use crate::config::MemoryConfig;
use crate::llm::ChatMessage;
use sdk::types::UserRecord;

const BASE_PROMPT: &str = "You are a friendly, knowledgeable travel planning assistant. Your goal is to help users plan amazing trips.

Your approach:
1. Ask clarifying questions to understand their needs (destination, duration, budget, interests)
2. Generate detailed, day-by-day itineraries
3. Remember their preferences and reference past trips
4. Be enthusiastic and helpful
5. Keep responses concise but informative

Guidelines:
- Always format itineraries clearly with day numbers
- Include specific recommendations (restaurants, activities, neighborhoods)
- Consider practical details (travel time, opening hours, budget)
- Adapt to their travel style (relaxed vs. packed schedule)
";

/// Builds the messages sent to the model for one exchange
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    context_turns: usize,
    trip_limit: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}

impl PromptBuilder {
    pub fn new(memory: &MemoryConfig) -> Self {
        Self {
            context_turns: memory.context_turns,
            trip_limit: memory.prompt_trip_limit,
        }
    }

    /// Compose the system prompt for a record
    pub fn build(&self, record: &UserRecord) -> String {
        let mut prompt = String::from(BASE_PROMPT);

        let prefs = &record.preferences;
        if !prefs.is_empty() {
            prompt.push_str("\n\nUser's preferences:\n");
            if let Some(budget) = prefs.budget {
                prompt.push_str(&format!("- Budget: {}\n", budget));
            }
            if !prefs.interests.is_empty() {
                prompt.push_str(&format!("- Interests: {}\n", prefs.interests.join(", ")));
            }
            if let Some(pace) = prefs.pace {
                prompt.push_str(&format!("- Travel pace: {}\n", pace));
            }
        }

        let trips = &record.saved_trips;
        if !trips.is_empty() && self.trip_limit > 0 {
            prompt.push_str("\n\nUser's past trips:\n");
            let start = trips.len().saturating_sub(self.trip_limit);
            for trip in &trips[start..] {
                prompt.push_str(&format!("- {} ({})\n", trip.destination, trip.duration));
            }
        }

        prompt
    }

    /// The most recent turns, oldest first
    pub fn recent_context(&self, record: &UserRecord) -> Vec<ChatMessage> {
        let history = &record.conversation_history;
        let start = history.len().saturating_sub(self.context_turns);
        history[start..].iter().map(ChatMessage::from).collect()
    }

    /// Full message list: system prompt, recent context, then the new user message
    pub fn messages(&self, record: &UserRecord, user_message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.context_turns + 2);
        messages.push(ChatMessage::system(self.build(record)));
        messages.extend(self.recent_context(record));
        messages.push(ChatMessage::user(user_message));

        tracing::debug!(
            "Built prompt: {} messages, {} chars",
            messages.len(),
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        messages
    }
}
