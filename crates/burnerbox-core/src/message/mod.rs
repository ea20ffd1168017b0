//! Canonical message model and retention policy.
//!
//! Raw API payloads are normalized into [`Message`] at the fetch boundary;
//! nothing past that point ever sees the wire's field-name variations.

mod model;
mod retention;

pub use model::{Attachment, Message};
pub use retention::{RetentionPolicy, TRUNCATION_MARKER};
