//! Retention policy for per-inbox caches.

use std::cmp::Ordering;

use super::Message;

/// Marker appended to bodies cut at the length cap.
pub const TRUNCATION_MARKER: &str = " [truncated]";

/// Bounds how many messages and how much body text are retained per inbox.
///
/// Applied on every merge, not only when a cap is exceeded, so the
/// persisted payload stays bounded and a write never has to be retried
/// just because a body grew past the backend's per-key ceiling.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    max_messages: usize,
    max_body_chars: usize,
}

impl RetentionPolicy {
    /// Create a policy with the given caps.
    #[must_use]
    pub const fn new(max_messages: usize, max_body_chars: usize) -> Self {
        Self {
            max_messages,
            max_body_chars,
        }
    }

    /// Sort newest-first, keep at most the configured message count and
    /// truncate every retained body to the configured length.
    ///
    /// Eviction always drops the oldest messages by timestamp; messages
    /// whose timestamp cannot be parsed sort oldest and go first.
    #[must_use]
    pub fn apply(&self, mut messages: Vec<Message>) -> Vec<Message> {
        messages.sort_by(newest_first);
        messages.truncate(self.max_messages);
        for message in &mut messages {
            self.truncate_body(message);
        }
        messages
    }

    fn truncate_body(&self, message: &mut Message) {
        if message.body.chars().count() <= self.max_body_chars {
            return;
        }
        let mut body: String = message.body.chars().take(self.max_body_chars).collect();
        body.push_str(TRUNCATION_MARKER);
        message.body = body;
    }
}

/// Newest-first ordering by parsed timestamp, raw string as tiebreak.
fn newest_first(a: &Message, b: &Message) -> Ordering {
    (b.parsed_timestamp(), &b.timestamp).cmp(&(a.parsed_timestamp(), &a.timestamp))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn message(timestamp: &str, body: &str) -> Message {
        Message {
            sender: "a@example.com".to_string(),
            receiver: "temp@burner.box".to_string(),
            subject: String::new(),
            body: body.to_string(),
            timestamp: timestamp.to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_newest_first_and_count_cap() {
        let policy = RetentionPolicy::new(2, 100);
        let merged = policy.apply(vec![
            message("2026-08-01T10:00:00Z", "oldest"),
            message("2026-08-03T10:00:00Z", "newest"),
            message("2026-08-02T10:00:00Z", "middle"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].body, "newest");
        assert_eq!(merged[1].body, "middle");
    }

    #[test]
    fn test_unparseable_timestamps_evicted_first() {
        let policy = RetentionPolicy::new(1, 100);
        let merged = policy.apply(vec![
            message("garbage", "undated"),
            message("2026-08-01T10:00:00Z", "dated"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].body, "dated");
    }

    #[test]
    fn test_body_truncation_is_idempotent() {
        let policy = RetentionPolicy::new(10, 5);
        let once = policy.apply(vec![message("2026-08-01T10:00:00Z", "0123456789")]);
        assert_eq!(once[0].body, format!("01234{TRUNCATION_MARKER}"));

        let twice = policy.apply(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_short_bodies_untouched() {
        let policy = RetentionPolicy::new(10, 100);
        let merged = policy.apply(vec![message("2026-08-01T10:00:00Z", "short")]);
        assert_eq!(merged[0].body, "short");
    }

    proptest! {
        #[test]
        fn prop_cap_always_holds(
            epochs in proptest::collection::vec(1_500_000_000_i64..1_900_000_000, 0..40),
            cap in 1_usize..10,
        ) {
            let policy = RetentionPolicy::new(cap, 100);
            let messages: Vec<Message> = epochs
                .iter()
                .map(|e| message(&e.to_string(), "body"))
                .collect();

            let retained = policy.apply(messages.clone());
            prop_assert!(retained.len() <= cap);

            // The retained set is the most-recent-by-timestamp subset
            let mut sorted: Vec<i64> = epochs.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            let expected: Vec<String> =
                sorted.iter().take(cap).map(ToString::to_string).collect();
            let got: Vec<String> =
                retained.iter().map(|m| m.timestamp.clone()).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
