//! `SQLite` store backend.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::{KeyValueStore, StoreError};

/// Key-value store backed by a `SQLite` database.
pub struct SqliteStore {
    pool: SqlitePool,
    max_value_bytes: Option<usize>,
}

impl SqliteStore {
    /// Create a store with the given database path.
    ///
    /// Creates the database and table if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self {
            pool,
            max_value_bytes: None,
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self {
            pool,
            max_value_bytes: None,
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Reject values larger than `bytes` with [`StoreError::CapacityExceeded`].
    #[must_use]
    pub fn with_value_limit(mut self, bytes: usize) -> Self {
        self.max_value_bytes = Some(bytes);
        self
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(r"SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.max_value_bytes
            && value.len() > limit
        {
            return Err(StoreError::CapacityExceeded {
                key: key.to_string(),
                size: value.len(),
                limit,
            });
        }

        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query(r"DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
