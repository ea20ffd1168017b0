//! # burnerbox-core
//!
//! Multi-inbox lookup and local cache synchronization engine for a
//! disposable-email service.
//!
//! This crate provides:
//! - **Lookup registry** - pin up to a configured number of throwaway
//!   addresses for longer-than-session monitoring
//! - **Per-inbox message cache** - merge remote snapshots into a bounded
//!   local cache without losing previously seen messages
//! - **Read-status tracking** - unread counts that survive re-fetches
//! - **Sync scheduler** - periodic refresh with per-address failure
//!   isolation
//! - **Key-value store** - pluggable persistence with in-memory and
//!   `SQLite` backends
//!
//! The remote API has no delivery or ordering guarantees and returns a
//! full snapshot per address; everything here is built around merging
//! those snapshots safely on a single device.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod fetch;
pub mod inbox;
pub mod lookup;
pub mod message;
pub mod store;

pub use config::LookupConfig;
pub use error::{Error, Result};
pub use fetch::{FetchError, MailFetcher};
pub use inbox::{InboxView, MessageCache, ReadStatus, RemovedInbox, TrackedInbox};
pub use lookup::{Lookup, Scheduler, refresh_all, refresh_one};
pub use message::{Attachment, Message, RetentionPolicy};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
