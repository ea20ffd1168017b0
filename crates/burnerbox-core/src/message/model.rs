//! Message data model.

use burnerbox_api::{RawAttachment, RawMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized, cached message.
///
/// Messages are immutable once cached; only their read status changes,
/// and that is tracked separately so it survives cache eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender address.
    pub sender: String,
    /// Recipient address (the monitored throwaway address).
    pub receiver: String,
    /// Subject line.
    pub subject: String,
    /// Message body, capped on ingestion by the retention policy.
    pub body: String,
    /// Timestamp exactly as the server sent it.
    pub timestamp: String,
    /// Attachment descriptors.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// An attachment descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment filename.
    pub filename: String,
    /// Download URL.
    pub url: String,
}

impl Message {
    /// Stable content-based identity used for deduplication.
    ///
    /// Derived from sender, receiver and the exact timestamp string. The
    /// server's own message ids are deliberately not part of this: they
    /// are omitted or change between fetches of the same inbox. Known
    /// limitation: if the server ever reuses the same triple for two
    /// genuinely different messages, they collapse into one cache entry.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}|{}|{}", self.sender, self.receiver, self.timestamp)
    }

    /// Build a canonical message from a raw API payload.
    ///
    /// Absent fields normalize to empty strings; attachments without a
    /// URL are kept with an empty one rather than dropped.
    #[must_use]
    pub fn from_raw(raw: RawMessage) -> Self {
        Self {
            sender: raw.sender.unwrap_or_default(),
            receiver: raw.receiver.unwrap_or_default(),
            subject: raw.subject.unwrap_or_default(),
            body: raw.body.unwrap_or_default(),
            timestamp: raw.timestamp.unwrap_or_default(),
            attachments: raw.attachments.into_iter().map(Attachment::from_raw).collect(),
        }
    }

    /// Best-effort parse of [`timestamp`](Self::timestamp) for ordering.
    ///
    /// Accepts RFC 3339 and numeric epoch values (seconds or milliseconds).
    /// Returns `None` for anything else; unparseable stamps sort oldest.
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(epoch) = self.timestamp.parse::<i64>() {
            // Values this large are epoch milliseconds, not seconds.
            let secs = if epoch.abs() >= 100_000_000_000 {
                epoch / 1000
            } else {
                epoch
            };
            return DateTime::from_timestamp(secs, 0);
        }
        None
    }
}

impl Attachment {
    fn from_raw(raw: RawAttachment) -> Self {
        Self {
            filename: raw.filename.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(sender: &str, timestamp: &str) -> Message {
        Message {
            sender: sender.to_string(),
            receiver: "temp@burner.box".to_string(),
            subject: "subject".to_string(),
            body: "body".to_string(),
            timestamp: timestamp.to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_identity_is_stable_across_fetches() {
        let a = message("alice@example.com", "2026-08-01T10:00:00Z");
        let mut b = a.clone();
        // Same logical message re-fetched with different mutable parts
        b.subject = "edited subject".to_string();
        b.body = "different body".to_string();

        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_distinguishes_by_timestamp() {
        let a = message("alice@example.com", "2026-08-01T10:00:00Z");
        let b = message("alice@example.com", "2026-08-01T10:00:01Z");
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_from_raw_normalizes_missing_fields() {
        let msg = Message::from_raw(RawMessage::default());
        assert_eq!(msg.sender, "");
        assert_eq!(msg.body, "");
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn test_parsed_timestamp_variants() {
        assert!(message("a", "2026-08-01T10:00:00Z").parsed_timestamp().is_some());
        assert!(message("a", "1722502800").parsed_timestamp().is_some());
        assert!(message("a", "1722502800000").parsed_timestamp().is_some());
        assert!(message("a", "next tuesday").parsed_timestamp().is_none());

        // Seconds and milliseconds of the same instant agree
        assert_eq!(
            message("a", "1722502800").parsed_timestamp(),
            message("a", "1722502800000").parsed_timestamp()
        );
    }
}
