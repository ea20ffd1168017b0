//! Pluggable key-value persistence.
//!
//! The engine treats its store as an opaque async key-value surface of
//! string blobs. Each monitored address owns a disjoint pair of keys (one
//! message-cache blob, one read-status blob) and the registry owns a single
//! address-list key, so writes for different addresses never contend.
//!
//! Device-local backends have a per-key size ceiling; a backend signals it
//! with [`StoreError::CapacityExceeded`] so the cache layer can evict and
//! retry instead of failing the merge.

mod memory;
mod sqlite;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors produced by store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write does not fit the backend's size budget, either because
    /// the value exceeds a per-key ceiling or because the store's total
    /// quota is exhausted. Freeing other keys may make a retry succeed.
    #[error("value for '{key}' exceeds store capacity ({size} bytes, limit {limit})")]
    CapacityExceeded {
        /// Key the write was aimed at.
        key: String,
        /// Size of the rejected value in bytes.
        size: usize,
        /// The ceiling or quota in bytes.
        limit: usize,
    },

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Async key-value store of opaque string blobs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value under `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Key namespace used by the engine.
pub mod keys {
    /// Key holding the serialized list of monitored addresses.
    #[must_use]
    pub const fn registry() -> &'static str {
        "burnerbox.addresses"
    }

    /// Key holding the message-cache blob for one address.
    #[must_use]
    pub fn cache(address: &str) -> String {
        format!("burnerbox.cache.{address}")
    }

    /// Key holding the read-status blob for one address.
    #[must_use]
    pub fn read(address: &str) -> String {
        format!("burnerbox.read.{address}")
    }
}
