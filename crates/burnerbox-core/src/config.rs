//! Engine configuration.
//!
//! All limits live here rather than as constants next to the code that
//! enforces them; the values below were tuned against real devices and
//! callers are expected to override them where their platform differs.

use std::time::Duration;

/// Configuration for the lookup engine.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Base number of monitoring slots.
    pub slot_limit: usize,
    /// Slot cap for the unlocked "extra slots" tier.
    ///
    /// The registry only enforces the number; whatever unlock mechanism
    /// gates this tier lives in the caller.
    pub extra_slot_limit: usize,
    /// Maximum retained messages per inbox.
    ///
    /// Generous because throwaway addresses can receive bursts.
    pub max_messages: usize,
    /// Maximum body length in characters; longer bodies are truncated on
    /// ingestion, never dropped.
    pub max_body_chars: usize,
    /// Interval between scheduled refresh passes.
    pub refresh_interval: Duration,
    /// Deadline for one remote fetch; overruns count as fetch failures.
    pub fetch_timeout: Duration,
    /// How many cache-eviction rounds a failed store write may trigger
    /// before the write is dropped for that round.
    pub eviction_rounds: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            slot_limit: 5,
            extra_slot_limit: 20,
            max_messages: 2000,
            max_body_chars: 50_000,
            refresh_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
            eviction_rounds: 3,
        }
    }
}

impl LookupConfig {
    /// Retention policy derived from the configured caps.
    #[must_use]
    pub const fn retention(&self) -> crate::message::RetentionPolicy {
        crate::message::RetentionPolicy::new(self.max_messages, self.max_body_chars)
    }
}
