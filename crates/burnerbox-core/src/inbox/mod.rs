//! Per-inbox state: tracked-inbox model, message cache, read status.

mod cache;
mod model;
mod read;

pub use cache::MessageCache;
pub use model::{InboxView, RemovedInbox, TrackedInbox};
pub use read::ReadStatus;
