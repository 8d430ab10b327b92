//! Durable key-value storage for single values such as the session token
//!
//! The SQLite-backed store is the on-device replacement for a simple
//! async key-value API. The in-memory store backs tests and ephemeral clients.

use crate::database::Database;
use crate::error::{DatabaseError, DatabaseResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Keyed storage of string values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> DatabaseResult<Option<String>>;

    /// Set a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> DatabaseResult<()>;

    /// Remove a key; removing a missing key is not an error
    async fn remove(&self, key: &str) -> DatabaseResult<()>;
}

/// Key-value store persisted in the `key_value_store` table
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db: Database,
}

impl SqliteKeyValueStore {
    /// Create a new store on top of a database handle
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> DatabaseResult<Option<String>> {
        let pool = self.db.pool().await?;

        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM key_value_store WHERE key = ?")
                .bind(key)
                .fetch_optional(pool)
                .await
                .map_err(DatabaseError::Query)?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> DatabaseResult<()> {
        let pool = self.db.pool().await?;

        sqlx::query(
            "INSERT INTO key_value_store (key, value)
             VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .map_err(DatabaseError::Query)?;

        debug!(key, "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> DatabaseResult<()> {
        let pool = self.db.pool().await?;

        sqlx::query("DELETE FROM key_value_store WHERE key = ?")
            .bind(key)
            .execute(pool)
            .await
            .map_err(DatabaseError::Query)?;

        debug!(key, "Removed value");
        Ok(())
    }
}

/// In-memory key-value store
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> DatabaseResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DatabaseResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DatabaseResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

impl MemoryKeyValueStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseConfig;

    #[tokio::test]
    async fn test_set_get_remove() -> anyhow::Result<()> {
        let store = SqliteKeyValueStore::new(Database::new(DatabaseConfig::in_memory()));

        assert_eq!(store.get("token").await?, None);

        store.set("token", "first").await?;
        assert_eq!(store.get("token").await?, Some("first".to_string()));

        store.set("token", "second").await?;
        assert_eq!(store.get("token").await?, Some("second".to_string()));

        store.remove("token").await?;
        assert_eq!(store.get("token").await?, None);

        // Removing again is a no-op
        store.remove("token").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store_matches_sqlite_semantics() -> anyhow::Result<()> {
        let store = MemoryKeyValueStore::new();

        store.set("a", "1").await?;
        store.set("a", "2").await?;
        assert_eq!(store.get("a").await?, Some("2".to_string()));

        store.remove("a").await?;
        store.remove("a").await?;
        assert_eq!(store.get("a").await?, None);
        Ok(())
    }
}
