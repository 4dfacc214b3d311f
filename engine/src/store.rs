//! Persistent user store
//!
//! Durable per-user key-value storage holding one JSON document per user id.
//! The store knows nothing about the document's shape; decoding and default
//! filling happen in the conversation layer.
//!
//! Writes are last-writer-wins. There is no compare-and-swap, so two
//! exchanges for the same user that interleave load and persist will lose
//! the earlier write.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Storage backend for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch the document stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the document stored under `key`
    async fn put(&self, key: &str, value: Value) -> Result<()>;
}

/// In-memory store, used for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored record
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
