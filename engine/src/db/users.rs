/// User record persistence
///
/// Each user id maps to one JSON document. `save` replaces the whole
/// document (upsert), so concurrent writers for the same user resolve as
/// last-writer-wins.
use anyhow::{Context, Result};
use async_trait::async_trait;
use sdk::errors::EngineError;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::store::UserStore;

/// Repository for user record documents
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the raw document for a user
    pub async fn load(&self, user_id: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT data FROM user_records WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user record")?;

        match row {
            Some(row) => {
                let data: String = row.get("data");
                let value = serde_json::from_str(&data)
                    .context("Stored user record is not valid JSON")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace the document for a user
    pub async fn save(&self, user_id: &str, value: &Value) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let data = serde_json::to_string(value).context("Failed to serialize user record")?;

        // Parameterized upsert; the whole document is replaced
        sqlx::query(
            "INSERT INTO user_records (user_id, data, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(data)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save user record")?;

        Ok(())
    }

    /// List user ids with a stored record, most recently updated first
    pub async fn list_users(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT user_id FROM user_records ORDER BY updated_at DESC, user_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        Ok(ids)
    }

    /// Delete a user's record
    ///
    /// Returns true if a record existed.
    pub async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_records WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user record")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get(&self, key: &str) -> crate::store::Result<Option<Value>> {
        self.load(key)
            .await
            .map_err(|e| EngineError::Store(format!("{:#}", e)))
    }

    async fn put(&self, key: &str, value: Value) -> crate::store::Result<()> {
        self.save(key, &value)
            .await
            .map_err(|e| EngineError::Store(format!("{:#}", e)))
    }
}
