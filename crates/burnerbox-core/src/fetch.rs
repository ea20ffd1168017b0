//! Remote fetch seam.
//!
//! The engine never talks HTTP directly; it consumes anything that can
//! produce a snapshot of raw messages for an address. Production wires in
//! [`burnerbox_api::ApiClient`]; tests inject scripted fetchers.

use async_trait::async_trait;
use burnerbox_api::{ApiClient, RawMessage};

/// A fetch that did not produce a snapshot.
///
/// The engine only logs these and falls back to the cached messages for
/// the affected address; the cause string exists for the log line.
#[derive(Debug, thiserror::Error)]
#[error("fetch failed: {0}")]
pub struct FetchError(pub String);

impl From<burnerbox_api::Error> for FetchError {
    fn from(e: burnerbox_api::Error) -> Self {
        Self(e.to_string())
    }
}

/// Source of inbox snapshots.
#[async_trait]
pub trait MailFetcher: Send + Sync {
    /// Fetch the current full snapshot for one address.
    ///
    /// "No messages" is `Ok(vec![])`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when no snapshot could be produced; the caller
    /// falls back to its cache.
    async fn fetch(&self, address: &str) -> Result<Vec<RawMessage>, FetchError>;
}

#[async_trait]
impl MailFetcher for ApiClient {
    async fn fetch(&self, address: &str) -> Result<Vec<RawMessage>, FetchError> {
        Ok(self.fetch_inbox(address).await?)
    }
}
