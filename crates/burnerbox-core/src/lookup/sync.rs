//! Refresh passes and the periodic scheduler.
//!
//! A refresh pass runs in three phases: snapshot the target addresses and
//! mark them in flight (under the lock), fetch all snapshots concurrently
//! (lock released), then merge the outcomes one address at a time (under
//! the lock again). The in-flight set is what keeps a manual refresh and
//! a scheduled pass from fetching the same address twice: a second pass
//! skips an in-flight address for that tick instead of queueing behind it.

use std::sync::Arc;
use std::time::Duration;

use burnerbox_api::RawMessage;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, warn};

use crate::error::Result;
use crate::fetch::{FetchError, MailFetcher};
use crate::inbox::InboxView;
use crate::message::Message;

use super::Lookup;

type FetchOutcome = std::result::Result<Vec<RawMessage>, FetchError>;

/// Refresh every monitored address that is not already in flight.
///
/// Fetches run concurrently, each bounded by the configured fetch
/// timeout; merges run serially afterwards. Per-address outcomes are
/// isolated: one failed fetch leaves that address on its cached messages
/// and does not affect any other address. Returns the resulting views.
pub async fn refresh_all(
    lookup: Arc<Mutex<Lookup>>,
    fetcher: Arc<dyn MailFetcher>,
) -> Vec<InboxView> {
    let (targets, fetch_timeout) = {
        let mut guard = lookup.lock().await;
        let targets: Vec<String> = guard
            .inboxes
            .iter()
            .map(|inbox| inbox.address.clone())
            .filter(|address| !guard.in_flight.contains(address))
            .collect();
        for address in &targets {
            guard.in_flight.insert(address.clone());
        }
        (targets, guard.config.fetch_timeout)
    };

    let mut tasks = JoinSet::new();
    for address in targets.clone() {
        let fetcher = Arc::clone(&fetcher);
        tasks.spawn(async move {
            let outcome = fetch_with_timeout(&*fetcher, &address, fetch_timeout).await;
            (address, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(targets.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(pair) => outcomes.push(pair),
            Err(e) => warn!(error = %e, "fetch task failed to complete"),
        }
    }

    let mut guard = lookup.lock().await;
    for (address, outcome) in outcomes {
        guard.apply_fetch(&address, outcome).await;
    }
    // A lost task would otherwise leave its address marked forever
    for address in &targets {
        guard.in_flight.remove(address);
    }
    guard.views().await
}

/// Refresh a single monitored address.
///
/// If a fetch for the address is already in flight this is a no-op that
/// returns the current view; the outstanding fetch's result will land on
/// its own.
///
/// # Errors
///
/// Returns [`Error::NotTracked`](crate::Error::NotTracked) if the address
/// is not monitored, including when it was removed while the fetch was in
/// flight.
pub async fn refresh_one(
    lookup: Arc<Mutex<Lookup>>,
    fetcher: Arc<dyn MailFetcher>,
    address: &str,
) -> Result<InboxView> {
    let fetch_timeout = {
        let mut guard = lookup.lock().await;
        let view = guard.view(address).await?;
        if !guard.in_flight.insert(address.to_string()) {
            debug!(address, "refresh already in flight, skipping");
            return Ok(view);
        }
        guard.config.fetch_timeout
    };

    let outcome = fetch_with_timeout(&*fetcher, address, fetch_timeout).await;

    let mut guard = lookup.lock().await;
    guard.apply_fetch(address, outcome).await;
    guard.view(address).await
}

async fn fetch_with_timeout(
    fetcher: &dyn MailFetcher,
    address: &str,
    deadline: Duration,
) -> FetchOutcome {
    match timeout(deadline, fetcher.fetch(address)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(FetchError(format!("no response within {deadline:?}"))),
    }
}

impl Lookup {
    /// Fold one fetch outcome into the engine state.
    ///
    /// Discards the result if the address was removed while the fetch was
    /// in flight, so a resolved fetch can never resurrect a removed inbox.
    pub(crate) async fn apply_fetch(&mut self, address: &str, outcome: FetchOutcome) {
        self.in_flight.remove(address);

        if !self.is_tracked(address) {
            debug!(address, "removed while fetch was in flight, discarding result");
            return;
        }

        match outcome {
            Ok(raw) => {
                let incoming: Vec<Message> = raw
                    .into_iter()
                    .map(|raw| {
                        let mut message = Message::from_raw(raw);
                        if message.receiver.is_empty() {
                            message.receiver = address.to_string();
                        }
                        message
                    })
                    .collect();

                let victims = self.eviction_order(address);
                self.cache.merge(address, incoming, &victims).await;

                if let Some(inbox) = self
                    .inboxes
                    .iter_mut()
                    .find(|inbox| inbox.address == address)
                {
                    inbox.last_fetched_at = Some(Utc::now());
                }
                if let Err(e) = self.persist_registry().await {
                    warn!(address, error = %e, "address list write failed");
                }
            }
            Err(e) => {
                warn!(address, error = %e, "refresh failed, keeping cached messages");
            }
        }
    }
}

/// Periodic refresh driver.
///
/// Ticks on a fixed interval while the registry is non-empty and returns
/// as soon as a tick finds no monitored addresses, so an idle engine does
/// no background work. The owner re-runs a scheduler after the next add.
pub struct Scheduler {
    lookup: Arc<Mutex<Lookup>>,
    fetcher: Arc<dyn MailFetcher>,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler driving `lookup` from `fetcher` every `interval`.
    #[must_use]
    pub fn new(
        lookup: Arc<Mutex<Lookup>>,
        fetcher: Arc<dyn MailFetcher>,
        interval: Duration,
    ) -> Self {
        Self {
            lookup,
            fetcher,
            interval,
        }
    }

    /// Run refresh passes until the registry is empty.
    ///
    /// The first pass runs immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.lookup.lock().await.is_empty() {
                debug!("no monitored addresses, scheduler stopping");
                return;
            }
            refresh_all(Arc::clone(&self.lookup), Arc::clone(&self.fetcher)).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::config::LookupConfig;
    use crate::store::{KeyValueStore, MemoryStore, keys};

    fn raw(sender: &str, timestamp: &str) -> RawMessage {
        serde_json::from_str(&format!(
            r#"{{"from": "{sender}", "to": "a@burner.box", "subject": "s",
                 "body": "b", "date": "{timestamp}"}}"#
        ))
        .unwrap()
    }

    /// Fetcher serving fixed per-address outcomes, counting calls.
    #[derive(Default)]
    struct ScriptedFetcher {
        snapshots: std::sync::Mutex<HashMap<String, std::result::Result<Vec<RawMessage>, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn set(&self, address: &str, outcome: std::result::Result<Vec<RawMessage>, String>) {
            self.snapshots
                .lock()
                .unwrap()
                .insert(address.to_string(), outcome);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MailFetcher for ScriptedFetcher {
        async fn fetch(&self, address: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.snapshots.lock().unwrap().get(address) {
                Some(Ok(raw)) => Ok(raw.clone()),
                Some(Err(e)) => Err(FetchError(e.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Fetcher that parks until released, to hold a fetch in flight.
    struct BlockingFetcher {
        entered: Notify,
        release: Notify,
    }

    impl BlockingFetcher {
        fn new() -> Self {
            Self {
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl MailFetcher for BlockingFetcher {
        async fn fetch(&self, _address: &str) -> FetchOutcome {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![raw("late@x", "2026-08-01T10:00:00Z")])
        }
    }

    async fn engine(store: Arc<MemoryStore>) -> Arc<Mutex<Lookup>> {
        let lookup = Lookup::open(store, LookupConfig::default()).await;
        Arc::new(Mutex::new(lookup))
    }

    #[tokio::test]
    async fn test_refresh_merges_snapshot_and_counts_unread() {
        let lookup = engine(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::default());

        {
            let mut guard = lookup.lock().await;
            guard.add("a@burner.box").await.unwrap();
            guard.add("b@burner.box").await.unwrap();
        }

        let three = vec![
            raw("1@x", "2026-08-01T10:00:00Z"),
            raw("2@x", "2026-08-01T11:00:00Z"),
            raw("3@x", "2026-08-01T12:00:00Z"),
        ];
        fetcher.set("a@burner.box", Ok(three.clone()));

        let views = refresh_all(Arc::clone(&lookup), fetcher.clone()).await;
        let a = views.iter().find(|v| v.inbox.address == "a@burner.box").unwrap();
        assert_eq!(a.messages.len(), 3);
        assert_eq!(a.unread, 3);
        assert!(a.inbox.last_fetched_at.is_some());

        // Next snapshot repeats the three and adds one new message
        let mut four = three;
        four.push(raw("4@x", "2026-08-01T13:00:00Z"));
        fetcher.set("a@burner.box", Ok(four));

        let views = refresh_all(Arc::clone(&lookup), fetcher).await;
        let a = views.iter().find(|v| v.inbox.address == "a@burner.box").unwrap();
        assert_eq!(a.messages.len(), 4);
        assert_eq!(a.unread, 4);
        assert_eq!(a.messages[0].sender, "4@x");
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let store = Arc::new(MemoryStore::new());
        let lookup = engine(Arc::clone(&store)).await;
        let fetcher = Arc::new(ScriptedFetcher::default());

        {
            let mut guard = lookup.lock().await;
            guard.add("a@burner.box").await.unwrap();
            guard.add("b@burner.box").await.unwrap();
        }

        fetcher.set("a@burner.box", Ok(vec![raw("1@x", "2026-08-01T10:00:00Z")]));
        fetcher.set("b@burner.box", Ok(vec![raw("2@x", "2026-08-01T10:00:00Z")]));
        refresh_all(Arc::clone(&lookup), fetcher.clone()).await;

        let a_blob_before = store.get(&keys::cache("a@burner.box")).await.unwrap();

        // Now A's fetch fails while B picks up a new message
        fetcher.set("a@burner.box", Err("server melted".to_string()));
        fetcher.set(
            "b@burner.box",
            Ok(vec![
                raw("2@x", "2026-08-01T10:00:00Z"),
                raw("5@x", "2026-08-02T10:00:00Z"),
            ]),
        );
        let views = refresh_all(Arc::clone(&lookup), fetcher).await;

        let a = views.iter().find(|v| v.inbox.address == "a@burner.box").unwrap();
        let b = views.iter().find(|v| v.inbox.address == "b@burner.box").unwrap();
        assert_eq!(a.messages.len(), 1);
        assert_eq!(b.messages.len(), 2);

        // A's persisted cache is byte-identical to before the pass
        let a_blob_after = store.get(&keys::cache("a@burner.box")).await.unwrap();
        assert_eq!(a_blob_after, a_blob_before);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_fetched_at() {
        let lookup = engine(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::default());

        lookup.lock().await.add("a@burner.box").await.unwrap();
        fetcher.set("a@burner.box", Err("boom".to_string()));

        let views = refresh_all(Arc::clone(&lookup), fetcher).await;
        assert_eq!(views[0].inbox.last_fetched_at, None);
    }

    #[tokio::test]
    async fn test_read_status_survives_refetch() {
        let lookup = engine(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::default());

        lookup.lock().await.add("a@burner.box").await.unwrap();
        fetcher.set("a@burner.box", Ok(vec![raw("1@x", "2026-08-01T10:00:00Z")]));

        let views = refresh_all(Arc::clone(&lookup), fetcher.clone()).await;
        let identity = views[0].messages[0].identity();
        lookup
            .lock()
            .await
            .mark_read("a@burner.box", &identity)
            .await
            .unwrap();

        // The server returns the same message again
        let views = refresh_all(Arc::clone(&lookup), fetcher).await;
        assert_eq!(views[0].messages.len(), 1);
        assert_eq!(views[0].unread, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_falls_back_to_cache() {
        struct NeverFetcher;

        #[async_trait]
        impl MailFetcher for NeverFetcher {
            async fn fetch(&self, _address: &str) -> FetchOutcome {
                std::future::pending().await
            }
        }

        let lookup = engine(Arc::new(MemoryStore::new())).await;
        lookup.lock().await.add("a@burner.box").await.unwrap();

        let views = refresh_all(Arc::clone(&lookup), Arc::new(NeverFetcher)).await;
        assert!(views[0].messages.is_empty());
        assert_eq!(views[0].inbox.last_fetched_at, None);
        assert!(lookup.lock().await.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_removal_during_flight_discards_result() {
        let store = Arc::new(MemoryStore::new());
        let lookup = engine(Arc::clone(&store)).await;
        let fetcher = Arc::new(BlockingFetcher::new());

        lookup.lock().await.add("a@burner.box").await.unwrap();

        let task = tokio::spawn(refresh_all(Arc::clone(&lookup), fetcher.clone()));
        fetcher.entered.notified().await;

        // Fetch is parked with the lock released; remove the address
        lookup.lock().await.remove("a@burner.box").await.unwrap();
        fetcher.release.notify_one();
        task.await.unwrap();

        let guard = lookup.lock().await;
        assert!(!guard.is_tracked("a@burner.box"));
        assert!(guard.in_flight.is_empty());
        assert_eq!(store.get(&keys::cache("a@burner.box")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_flight_address_is_skipped_not_queued() {
        let lookup = engine(Arc::new(MemoryStore::new())).await;
        let blocking = Arc::new(BlockingFetcher::new());

        lookup.lock().await.add("a@burner.box").await.unwrap();

        let task = tokio::spawn(refresh_all(Arc::clone(&lookup), blocking.clone()));
        blocking.entered.notified().await;

        // A manual refresh while the scheduled fetch is outstanding skips
        // the address rather than firing a second fetch
        let counting = Arc::new(ScriptedFetcher::default());
        let view = refresh_one(Arc::clone(&lookup), counting.clone(), "a@burner.box")
            .await
            .unwrap();
        assert!(view.messages.is_empty());
        assert_eq!(counting.calls(), 0);

        blocking.release.notify_one();
        task.await.unwrap();

        // The original fetch still landed
        let view = lookup.lock().await.view("a@burner.box").await.unwrap();
        assert_eq!(view.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_stops_when_registry_empties() {
        let lookup = engine(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::default());

        lookup.lock().await.add("a@burner.box").await.unwrap();

        let scheduler = Scheduler::new(
            Arc::clone(&lookup),
            fetcher.clone(),
            Duration::from_secs(30),
        );
        let handle = tokio::spawn(scheduler.run());

        // Immediate pass plus at least one scheduled tick
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(fetcher.calls() >= 2);
        assert!(!handle.is_finished());

        lookup.lock().await.remove("a@burner.box").await.unwrap();
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(handle.is_finished());
    }
}
