//! Wire models for the disposable-mail API.
//!
//! The server's JSON is not stable: field names vary between deployments
//! (`from` vs `sender`, `body` vs `message`) and most fields can be absent.
//! These types absorb all observed variants; normalization to a canonical
//! message shape is the consumer's job.

use serde::{Deserialize, Deserializer};

/// One message as returned by `GET /api/emails/{address}`.
///
/// Some deployments attach an `id` field; it is deliberately not modeled
/// here because it is absent or unstable across fetches of the same inbox.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    /// Sender address (`sender` or `from`).
    #[serde(default, alias = "from")]
    pub sender: Option<String>,

    /// Recipient address (`receiver` or `to`).
    #[serde(default, alias = "to")]
    pub receiver: Option<String>,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// Message body (`body`, `message` or `content`).
    #[serde(default, alias = "message", alias = "content")]
    pub body: Option<String>,

    /// Timestamp as sent by the server (`timestamp` or `date`).
    ///
    /// Kept verbatim; some deployments send RFC 3339 strings, others send
    /// numeric epoch values.
    #[serde(
        default,
        alias = "date",
        deserialize_with = "string_or_number"
    )]
    pub timestamp: Option<String>,

    /// Attachment descriptors.
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
}

/// Attachment descriptor inside a [`RawMessage`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttachment {
    /// Attachment filename (`filename` or `name`).
    #[serde(default, alias = "name")]
    pub filename: Option<String>,

    /// Download URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of `GET /api/generate_email`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedAddress {
    /// The freshly minted address.
    pub email: String,
}

/// Accepts a JSON string or number and yields its string form.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}
