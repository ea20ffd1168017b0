//! Read-status tracking.
//!
//! Read identities are stored separately from the message cache so that
//! marking a message read survives cache eviction and re-fetching: a
//! re-fetched message with a known identity comes back already read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::message::Message;
use crate::store::{KeyValueStore, StoreError, keys};

/// Tracks which message identities have been acknowledged, per address.
///
/// The set only grows; there is no "mark unread".
pub struct ReadStatus {
    store: Arc<dyn KeyValueStore>,
    read: HashMap<String, HashSet<String>>,
}

impl ReadStatus {
    /// Create a tracker over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            read: HashMap::new(),
        }
    }

    /// Whether an identity has been marked read for an address.
    pub async fn is_read(&mut self, address: &str, identity: &str) -> bool {
        self.loaded(address).await.contains(identity)
    }

    /// Mark an identity as read and persist the updated set.
    ///
    /// Idempotent; already-read identities skip the store write. The
    /// identity does not need to be currently cached: marking an evicted
    /// message read means its future re-fetch arrives already read.
    pub async fn mark_read(&mut self, address: &str, identity: &str) {
        if !self.loaded(address).await.insert(identity.to_string()) {
            return;
        }
        self.persist(address).await;
    }

    /// Count cached messages whose identity is not in the read set.
    pub async fn unread_count(&mut self, address: &str, messages: &[Message]) -> usize {
        let read = self.loaded(address).await;
        messages
            .iter()
            .filter(|m| !read.contains(&m.identity()))
            .count()
    }

    /// Snapshot the read set for an address (for undo support).
    pub async fn read_set(&mut self, address: &str) -> HashSet<String> {
        self.loaded(address).await.clone()
    }

    /// Delete the read set for an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub async fn remove(&mut self, address: &str) -> Result<(), StoreError> {
        self.read.remove(address);
        self.store.remove(&keys::read(address)).await
    }

    /// Reinstate a previously removed address's read set.
    pub async fn restore(&mut self, address: &str, read: HashSet<String>) {
        self.read.insert(address.to_string(), read);
        self.persist(address).await;
    }

    /// Load the set for an address into memory, treating a store miss,
    /// read failure or corrupt blob as an empty set.
    async fn loaded(&mut self, address: &str) -> &mut HashSet<String> {
        if !self.read.contains_key(address) {
            let read = match self.store.get(&keys::read(address)).await {
                Ok(Some(blob)) => match serde_json::from_str(&blob) {
                    Ok(read) => read,
                    Err(e) => {
                        warn!(address, error = %e, "corrupt read-status blob, starting empty");
                        HashSet::new()
                    }
                },
                Ok(None) => HashSet::new(),
                Err(e) => {
                    warn!(address, error = %e, "read-status read failed, starting empty");
                    HashSet::new()
                }
            };
            self.read.insert(address.to_string(), read);
        }

        // Entry guaranteed present
        self.read.entry(address.to_string()).or_default()
    }

    async fn persist(&mut self, address: &str) {
        let Some(read) = self.read.get(address) else {
            return;
        };
        let mut sorted: Vec<&String> = read.iter().collect();
        sorted.sort();

        let blob = match serde_json::to_string(&sorted) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(address, error = %e, "read-status serialization failed");
                return;
            }
        };

        if let Err(e) = self.store.set(&keys::read(address), &blob).await {
            warn!(address, error = %e, "read-status write failed, keeping in-memory set");
        }
    }
}
