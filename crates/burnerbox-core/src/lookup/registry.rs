//! The lookup registry.
//!
//! [`Lookup`] is the engine's single explicit state object: it owns the
//! list of monitored addresses, the per-inbox message cache, the
//! read-status tracker and the in-flight bookkeeping, all over one shared
//! store handle. Mutations to the address list always go read-modify-write
//! against the in-memory list, never against a stale snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::config::LookupConfig;
use crate::error::{Error, Result};
use crate::inbox::{InboxView, MessageCache, ReadStatus, RemovedInbox, TrackedInbox};
use crate::store::{KeyValueStore, keys};

/// The multi-inbox lookup engine.
pub struct Lookup {
    pub(crate) config: LookupConfig,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) inboxes: Vec<TrackedInbox>,
    pub(crate) cache: MessageCache,
    pub(crate) read: ReadStatus,
    pub(crate) in_flight: HashSet<String>,
}

impl Lookup {
    /// Open the engine over a store, loading the persisted address list.
    ///
    /// A missing, unreadable or corrupt list starts the registry empty;
    /// opening never fails.
    pub async fn open(store: Arc<dyn KeyValueStore>, config: LookupConfig) -> Self {
        let inboxes = match store.get(keys::registry()).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(inboxes) => inboxes,
                Err(e) => {
                    warn!(error = %e, "corrupt address list, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "address list read failed, starting empty");
                Vec::new()
            }
        };

        let cache = MessageCache::new(
            Arc::clone(&store),
            config.retention(),
            config.eviction_rounds,
        );
        let read = ReadStatus::new(Arc::clone(&store));

        Self {
            config,
            store,
            inboxes,
            cache,
            read,
            in_flight: HashSet::new(),
        }
    }

    /// Start monitoring an address within the base slot tier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAddress`] if the address is already
    /// monitored, or [`Error::LimitExceeded`] if the registry is at the
    /// base cap. Neither mutates the registry.
    pub async fn add(&mut self, address: &str) -> Result<()> {
        let limit = self.config.slot_limit;
        self.insert(address, limit).await
    }

    /// Start monitoring an address within the unlocked "extra slots" tier.
    ///
    /// The registry only enforces the larger numeric cap; gating the
    /// unlock is the caller's concern.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add), against the extra-tier cap.
    pub async fn add_extra(&mut self, address: &str) -> Result<()> {
        let limit = self.config.extra_slot_limit;
        self.insert(address, limit).await
    }

    async fn insert(&mut self, address: &str, limit: usize) -> Result<()> {
        if self.is_tracked(address) {
            return Err(Error::DuplicateAddress(address.to_string()));
        }
        if self.inboxes.len() >= limit {
            return Err(Error::LimitExceeded { limit });
        }

        self.inboxes.push(TrackedInbox::new(address));
        if let Err(e) = self.persist_registry().await {
            // Absorbed: the in-memory list is authoritative and the next
            // mutation re-persists it in full.
            warn!(address, error = %e, "address list write failed");
        }
        Ok(())
    }

    /// Stop monitoring an address, deleting its cache and read status.
    ///
    /// Returns an undo snapshot; pass it to [`restore`](Self::restore)
    /// within a bounded time to reinstate the inbox without refetching.
    /// Dropping the snapshot makes the removal final, with no residual
    /// persisted data for the address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTracked`] if the address is not monitored, or
    /// a store error if the cleanup deletes fail.
    pub async fn remove(&mut self, address: &str) -> Result<RemovedInbox> {
        let index = self
            .inboxes
            .iter()
            .position(|inbox| inbox.address == address)
            .ok_or_else(|| Error::NotTracked(address.to_string()))?;

        let messages = self.cache.load(address).await;
        let read = self.read.read_set(address).await;
        let inbox = self.inboxes.remove(index);

        self.persist_registry().await?;
        self.cache.remove(address).await?;
        self.read.remove(address).await?;

        Ok(RemovedInbox {
            inbox,
            messages,
            read,
        })
    }

    /// Reinstate a previously removed inbox, including its cached
    /// messages and read set.
    ///
    /// Checked against the extra-tier cap so an undo never fails for a
    /// user who filled the base tier after unlocking more slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAddress`] if the address was re-added in
    /// the meantime, [`Error::LimitExceeded`] if no slot is free, or a
    /// store error if re-persisting the address list fails.
    pub async fn restore(&mut self, removed: RemovedInbox) -> Result<()> {
        let address = removed.inbox.address.clone();
        if self.is_tracked(&address) {
            return Err(Error::DuplicateAddress(address));
        }
        let limit = self.config.extra_slot_limit;
        if self.inboxes.len() >= limit {
            return Err(Error::LimitExceeded { limit });
        }

        let victims = self.eviction_order(&address);
        self.cache.restore(&address, removed.messages, &victims).await;
        self.read.restore(&address, removed.read).await;
        self.inboxes.push(removed.inbox);
        self.persist_registry().await?;
        Ok(())
    }

    /// Aggregated views of all monitored inboxes, in registry order.
    pub async fn views(&mut self) -> Vec<InboxView> {
        let inboxes = self.inboxes.clone();
        let mut views = Vec::with_capacity(inboxes.len());
        for inbox in inboxes {
            let messages = self.cache.load(&inbox.address).await;
            let unread = self.read.unread_count(&inbox.address, &messages).await;
            views.push(InboxView {
                inbox,
                messages,
                unread,
            });
        }
        views
    }

    /// View of one monitored inbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTracked`] if the address is not monitored.
    pub async fn view(&mut self, address: &str) -> Result<InboxView> {
        let inbox = self
            .inboxes
            .iter()
            .find(|inbox| inbox.address == address)
            .cloned()
            .ok_or_else(|| Error::NotTracked(address.to_string()))?;

        let messages = self.cache.load(address).await;
        let unread = self.read.unread_count(address, &messages).await;
        Ok(InboxView {
            inbox,
            messages,
            unread,
        })
    }

    /// Mark a message identity as read for a monitored address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTracked`] if the address is not monitored.
    pub async fn mark_read(&mut self, address: &str, identity: &str) -> Result<()> {
        if !self.is_tracked(address) {
            return Err(Error::NotTracked(address.to_string()));
        }
        self.read.mark_read(address, identity).await;
        Ok(())
    }

    /// Sum of unread counts across all monitored addresses.
    pub async fn total_unread(&mut self) -> usize {
        let mut total = 0;
        for inbox in self.inboxes.clone() {
            let messages = self.cache.load(&inbox.address).await;
            total += self.read.unread_count(&inbox.address, &messages).await;
        }
        total
    }

    /// Whether an address is currently monitored.
    #[must_use]
    pub fn is_tracked(&self, address: &str) -> bool {
        self.inboxes.iter().any(|inbox| inbox.address == address)
    }

    /// Number of monitored addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    /// Whether no addresses are monitored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Other inboxes' addresses in cache-eviction order: oldest fetch
    /// first, never-fetched last (they have nothing cached to free). The
    /// ordering comes from the persisted registry, so blobs written by a
    /// previous process run are eligible victims too.
    pub(crate) fn eviction_order(&self, keep: &str) -> Vec<String> {
        let mut others: Vec<&TrackedInbox> = self
            .inboxes
            .iter()
            .filter(|inbox| inbox.address != keep)
            .collect();
        others.sort_by_key(|inbox| (inbox.last_fetched_at.is_none(), inbox.last_fetched_at));
        others
            .into_iter()
            .map(|inbox| inbox.address.clone())
            .collect()
    }

    pub(crate) async fn persist_registry(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.inboxes)?;
        self.store.set(keys::registry(), &blob).await?;
        Ok(())
    }
}
