//! Lookup registry and sync scheduling.

mod registry;
mod sync;

pub use registry::Lookup;
pub use sync::{Scheduler, refresh_all, refresh_one};
