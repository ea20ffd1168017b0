//! Error types for the core library.

use thiserror::Error;

/// Errors that cross the engine boundary.
///
/// Transient network and storage failures during a refresh never appear
/// here; they are absorbed inside the engine (the affected address simply
/// keeps its last-known cache for that round). Only user-actionable
/// conditions are surfaced.
#[derive(Debug, Error)]
pub enum Error {
    /// The registry is already at its slot cap.
    #[error("monitoring limit reached ({limit} addresses)")]
    LimitExceeded {
        /// The cap that was hit.
        limit: usize,
    },

    /// The address is already being monitored.
    #[error("address already monitored: {0}")]
    DuplicateAddress(String),

    /// The address is not in the registry.
    #[error("address not monitored: {0}")]
    NotTracked(String),

    /// Persistent store operation failed.
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
