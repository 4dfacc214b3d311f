//! Integration tests for the exchange flow
//!
//! Runs full exchanges against in-memory and SQLite stores with a scripted
//! inference provider standing in for the hosted model.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{Budget, TurnRole};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use wayfarer_engine::config::{InferenceConfig, MemoryConfig};
use wayfarer_engine::conversation::{ConversationStateManager, ExchangeService};
use wayfarer_engine::db::Database;
use wayfarer_engine::llm::{
    ChatRole, InferenceError, InferenceProvider, InferenceRequest, InferenceResponse,
};
use wayfarer_engine::store::{InMemoryUserStore, UserStore};

/// Replies from a queue and remembers every request
#[derive(Default)]
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<Option<String>, String>>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedProvider {
    fn replying(replies: &[&str]) -> Arc<Self> {
        let provider = Self::default();
        {
            let mut queue = provider.replies.lock().unwrap();
            for reply in replies {
                queue.push_back(Ok(Some(reply.to_string())));
            }
        }
        Arc::new(provider)
    }

    fn push_failure(&self, reason: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(
        &self,
        request: &InferenceRequest,
    ) -> wayfarer_engine::llm::Result<InferenceResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(InferenceResponse { response }),
            Some(Err(reason)) => Err(InferenceError::ProviderUnavailable(reason)),
            None => Ok(InferenceResponse::new("ok")),
        }
    }
}

fn in_memory_service(provider: Arc<ScriptedProvider>) -> (Arc<InMemoryUserStore>, ExchangeService) {
    let store = Arc::new(InMemoryUserStore::new());
    let service = ExchangeService::new(
        store.clone(),
        InferenceConfig::default(),
        &MemoryConfig::default(),
    )
    .with_provider(provider);
    (store, service)
}

#[tokio::test]
async fn test_tokyo_scenario() {
    let provider = ScriptedProvider::replying(&["Day 1: Tsukiji market..."]);
    let (_, service) = in_memory_service(provider);

    let reply = service
        .chat(
            "traveler",
            "I want to plan a 5 day trip to Tokyo, I love food and culture",
        )
        .await
        .unwrap();

    let trip = reply.saved_trip.expect("trip should be saved");
    assert_eq!(trip.destination, "Tokyo");
    assert_eq!(trip.duration, "5 days");
    assert_eq!(trip.itinerary, "Day 1: Tsukiji market...");
    assert_eq!(trip.id, format!("trip_{}", trip.created_at));

    let record = service.profile("traveler").await.unwrap();
    let interests = &record.preferences.interests;
    assert!(interests.contains(&"food".to_string()));
    assert!(interests.contains(&"culture".to_string()));
    assert_eq!(record.saved_trips.len(), 1);
}

#[tokio::test]
async fn test_paris_scenario() {
    let provider = ScriptedProvider::replying(&["Week 1: Left Bank"]);
    let (_, service) = in_memory_service(provider);

    service
        .chat("traveler", "trip to Paris for 2 weeks, budget travel")
        .await
        .unwrap();

    let trips = service.trips("traveler").await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].destination, "Paris");
    assert_eq!(trips[0].duration, "2 weeks");

    let record = service.profile("traveler").await.unwrap();
    assert_eq!(record.preferences.budget, Some(Budget::Budget));
}

#[tokio::test]
async fn test_repeated_destination_is_not_duplicated() {
    let provider = ScriptedProvider::replying(&["first", "second"]);
    let (_, service) = in_memory_service(provider);

    let first = service
        .chat("traveler", "5 day trip to Lisbon please")
        .await
        .unwrap();
    assert!(first.saved_trip.is_some());

    let second = service
        .chat("traveler", "actually make it a 7 day trip to LISBON, luxury")
        .await
        .unwrap();
    assert!(second.saved_trip.is_none());

    let record = service.profile("traveler").await.unwrap();
    assert_eq!(record.saved_trips.len(), 1);
    assert_eq!(record.saved_trips[0].duration, "5 days");
    // no new trip, so no preference update either
    assert_eq!(record.preferences.budget, None);
    assert_eq!(record.conversation_history.len(), 4);
}

#[tokio::test]
async fn test_unknown_user_has_no_trips() {
    let (store, service) = in_memory_service(ScriptedProvider::replying(&[]));
    let trips = service.trips("never-seen").await.unwrap();
    assert!(trips.is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_failed_inference_persists_nothing() {
    let provider = ScriptedProvider::replying(&["Day 1"]);
    let (store, service) = in_memory_service(provider.clone());

    service.chat("traveler", "hello").await.unwrap();
    let before = store.get("traveler").await.unwrap();

    provider.push_failure("upstream 503");
    let err = service
        .chat("traveler", "5 day trip to Tokyo")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Inference(_)));

    let after = store.get("traveler").await.unwrap();
    assert_eq!(before, after);

    let record = service.profile("traveler").await.unwrap();
    assert_eq!(record.conversation_history.len(), 2);
    assert!(record.saved_trips.is_empty());
}

#[tokio::test]
async fn test_request_carries_prompt_context_and_message() {
    let provider = ScriptedProvider::replying(&[]);
    let (_, service) = in_memory_service(provider.clone());

    for i in 0..8 {
        service
            .chat("traveler", &format!("message {}", i))
            .await
            .unwrap();
    }
    service
        .chat("traveler", "5 day trip to Tokyo with cheap food")
        .await
        .unwrap();
    service.chat("traveler", "what next?").await.unwrap();

    let requests = provider.requests();
    let last = requests.last().unwrap();

    // system + last 10 stored turns + new message
    assert_eq!(last.messages.len(), 12);
    assert_eq!(last.messages[0].role, ChatRole::System);
    assert!(last.messages[0].content.contains("- Budget: budget"));
    assert!(last.messages[0].content.contains("- Tokyo (5 days)"));
    assert_eq!(last.messages[1].content, "message 4");
    assert_eq!(last.messages[11].role, ChatRole::User);
    assert_eq!(last.messages[11].content, "what next?");
    assert_eq!(last.max_tokens, 1024);
    assert!((last.temperature - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_history_capped_across_exchanges() {
    let provider = ScriptedProvider::replying(&[]);
    let (_, service) = in_memory_service(provider);

    for i in 0..15 {
        service
            .chat("traveler", &format!("message {}", i))
            .await
            .unwrap();
    }

    let record = service.profile("traveler").await.unwrap();
    let history = &record.conversation_history;
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].content, "message 5");
    assert_eq!(history[0].role, TurnRole::User);
    assert_eq!(history[19].role, TurnRole::Assistant);
}

#[tokio::test]
async fn test_twenty_five_turns_one_at_a_time_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("wayfarer.db"))
        .await
        .unwrap();
    let store: Arc<dyn UserStore> = Arc::new(db.users());
    let manager = ConversationStateManager::new(store, &MemoryConfig::default());

    for i in 1..=25 {
        let mut record = manager.load_or_default("traveler").await.unwrap();
        let role = if i % 2 == 1 {
            TurnRole::User
        } else {
            TurnRole::Assistant
        };
        manager.record_turn(&mut record, role, format!("turn {}", i), i);
        manager.persist("traveler", &record).await.unwrap();
    }

    let record = manager.load_or_default("traveler").await.unwrap();
    let contents: Vec<String> = record
        .conversation_history
        .iter()
        .map(|t| t.content.clone())
        .collect();
    let expected: Vec<String> = (6..=25).map(|i| format!("turn {}", i)).collect();
    assert_eq!(contents, expected);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_exchange_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("wayfarer.db");

    {
        let db = Database::new(&db_path).await.unwrap();
        let service = ExchangeService::new(
            Arc::new(db.users()),
            InferenceConfig::default(),
            &MemoryConfig::default(),
        )
        .with_provider(ScriptedProvider::replying(&["Day 1: Alfama"]));
        service
            .chat("traveler", "going to Lisbon for 3 days, relaxed pace")
            .await
            .unwrap();
        db.close().await.unwrap();
    }

    let db = Database::new(&db_path).await.unwrap();
    let service = ExchangeService::new(
        Arc::new(db.users()),
        InferenceConfig::default(),
        &MemoryConfig::default(),
    );
    let record = service.profile("traveler").await.unwrap();
    assert_eq!(record.saved_trips[0].destination, "Lisbon");
    assert_eq!(record.saved_trips[0].duration, "3 days");
    assert!(record.preferences.interests.contains(&"relaxation".to_string()));
    db.close().await.unwrap();
}

/// Exchanges for one user are not serialized: both load the same record and
/// the later persist replaces the earlier one. This test pins that
/// last-writer-wins behavior so a change to it is deliberate.
#[tokio::test]
async fn test_same_user_race_loses_earlier_write() {
    let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let manager = ConversationStateManager::new(store, &MemoryConfig::default());

    let mut first = manager.load_or_default("traveler").await.unwrap();
    let mut second = manager.load_or_default("traveler").await.unwrap();

    manager.apply_exchange(&mut first, "5 day trip to Tokyo", "Tokyo plan", 1);
    manager.apply_exchange(&mut second, "3 day trip to Rome", "Rome plan", 2);

    manager.persist("traveler", &first).await.unwrap();
    manager.persist("traveler", &second).await.unwrap();

    let stored = manager.load_or_default("traveler").await.unwrap();
    assert_eq!(stored.conversation_history.len(), 2);
    assert_eq!(stored.saved_trips.len(), 1);
    assert_eq!(stored.saved_trips[0].destination, "Rome");
    assert!(!stored.has_trip_to("Tokyo"));
}

#[tokio::test]
async fn test_legacy_record_is_migrated_on_next_persist() {
    let store = Arc::new(InMemoryUserStore::new());
    store
        .put(
            "traveler",
            serde_json::json!({
                "preferences": {"interests": ["food", "food"]},
                "conversationHistory": [],
                "savedTrips": [],
                "currentTrip": null
            }),
        )
        .await
        .unwrap();

    let service = ExchangeService::new(
        store.clone(),
        InferenceConfig::default(),
        &MemoryConfig::default(),
    );
    service
        .save_exchange("traveler", "hello", "hi there")
        .await
        .unwrap();

    let stored = store.get("traveler").await.unwrap().unwrap();
    assert!(stored.get("currentTrip").is_none());
    assert_eq!(stored["preferences"]["interests"], serde_json::json!(["food"]));
    assert_eq!(stored["conversationHistory"].as_array().unwrap().len(), 2);
}
