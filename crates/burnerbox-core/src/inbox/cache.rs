//! Per-inbox message cache.
//!
//! Owns the merge/cleanup/persist cycle for each monitored address and an
//! in-memory mirror of the persisted state for fast synchronous reads
//! within a session. Storage failures are local and non-fatal: they
//! degrade to "not cached this round" for one address and never block
//! another address's cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::message::{Message, RetentionPolicy};
use crate::store::{KeyValueStore, StoreError, keys};

/// Message cache over a key-value store, one blob per address.
///
/// The cache holds no cross-session state of its own: when a write needs
/// room, eviction victims are supplied by the caller, which knows the
/// registry's fetch history and can rank persisted blobs from previous
/// runs too.
pub struct MessageCache {
    store: Arc<dyn KeyValueStore>,
    policy: RetentionPolicy,
    eviction_rounds: usize,
    mirror: HashMap<String, Vec<Message>>,
}

impl MessageCache {
    /// Create a cache over `store` applying `policy` on every merge.
    ///
    /// `eviction_rounds` bounds how many other inboxes' blobs a single
    /// oversized write may evict before giving up.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        policy: RetentionPolicy,
        eviction_rounds: usize,
    ) -> Self {
        Self {
            store,
            policy,
            eviction_rounds,
            mirror: HashMap::new(),
        }
    }

    /// Load the cached messages for an address.
    ///
    /// A store miss, a read failure and a corrupt blob all yield an empty
    /// vector; this never fails.
    pub async fn load(&mut self, address: &str) -> Vec<Message> {
        if let Some(messages) = self.mirror.get(address) {
            return messages.clone();
        }

        let messages = match self.store.get(&keys::cache(address)).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(address, error = %e, "corrupt cache blob, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(address, error = %e, "cache read failed, starting empty");
                Vec::new()
            }
        };

        self.mirror.insert(address.to_string(), messages.clone());
        messages
    }

    /// Merge an incoming snapshot into the cache for an address.
    ///
    /// Only messages whose identity is new are appended; the retention
    /// policy then bounds the result, and the outcome is persisted.
    /// `victims` names other addresses whose persisted blobs may be
    /// evicted, in order, if the write does not fit. Merging the same
    /// snapshot twice is a no-op the second time.
    pub async fn merge(
        &mut self,
        address: &str,
        incoming: Vec<Message>,
        victims: &[String],
    ) -> Vec<Message> {
        let mut merged = self.load(address).await;
        let mut seen: HashSet<String> = merged.iter().map(Message::identity).collect();

        for message in incoming {
            if seen.insert(message.identity()) {
                merged.push(message);
            }
        }

        let merged = self.policy.apply(merged);
        self.save(address, &merged, victims).await;
        merged
    }

    /// Persist the message set for an address.
    ///
    /// On a capacity failure, evicts the victims' persisted blobs in the
    /// order given and retries, up to the configured number of rounds; if
    /// that is not enough the write is dropped for this round (the
    /// in-memory mirror stays current and the next merge retries).
    pub async fn save(&mut self, address: &str, messages: &[Message], victims: &[String]) {
        self.mirror
            .insert(address.to_string(), messages.to_vec());

        let blob = match serde_json::to_string(messages) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(address, error = %e, "cache serialization failed, not persisting");
                return;
            }
        };

        let key = keys::cache(address);
        let mut remaining = victims.iter();
        for _ in 0..=self.eviction_rounds {
            match self.store.set(&key, &blob).await {
                Ok(()) => return,
                Err(StoreError::CapacityExceeded { size, limit, .. }) => {
                    debug!(address, size, limit, "cache write over capacity, evicting");
                    let Some(victim) = remaining.next() else {
                        break;
                    };
                    // A victim's mirror entry stays valid for the session
                    if let Err(e) = self.store.remove(&keys::cache(victim)).await {
                        warn!(address = %victim, error = %e, "eviction failed");
                        break;
                    }
                    debug!(address = %victim, "evicted cache blob to free store space");
                }
                Err(e) => {
                    warn!(address, error = %e, "cache write failed, not persisting this round");
                    return;
                }
            }
        }

        warn!(address, "giving up on cache write after eviction rounds");
    }

    /// Delete all cached data for an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub async fn remove(&mut self, address: &str) -> Result<(), StoreError> {
        self.mirror.remove(address);
        self.store.remove(&keys::cache(address)).await
    }

    /// Reinstate a previously removed address's messages.
    pub async fn restore(&mut self, address: &str, messages: Vec<Message>, victims: &[String]) {
        let messages = self.policy.apply(messages);
        self.save(address, &messages, victims).await;
    }
}
