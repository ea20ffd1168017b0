//! Inbox data models.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// A throwaway address pinned for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedInbox {
    /// The monitored address, unique across the registry.
    pub address: String,
    /// When monitoring started. Never mutated.
    pub added_at: DateTime<Utc>,
    /// Time of the last successful remote fetch, if any.
    #[serde(default)]
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl TrackedInbox {
    /// Create a freshly tracked inbox with `added_at = now`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            added_at: Utc::now(),
            last_fetched_at: None,
        }
    }
}

/// Aggregated view of one monitored inbox, handed to the UI layer.
///
/// Derived on demand from the tracked inbox, its message cache and its
/// read set; never persisted.
#[derive(Debug, Clone)]
pub struct InboxView {
    /// The tracked inbox.
    pub inbox: TrackedInbox,
    /// Cached messages, newest first.
    pub messages: Vec<Message>,
    /// Cached messages whose identity has not been marked read.
    pub unread: usize,
}

/// Undo snapshot returned by removal.
///
/// Holding on to this for a bounded time lets the caller offer an "undo"
/// affordance: `restore` reinstates the inbox, its cached messages and its
/// read set without refetching anything from the network.
#[derive(Debug, Clone)]
pub struct RemovedInbox {
    /// The inbox as it was when removed.
    pub inbox: TrackedInbox,
    /// Its last-known cached messages.
    pub messages: Vec<Message>,
    /// Its read-identity set.
    pub read: HashSet<String>,
}
