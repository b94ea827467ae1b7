//! Progress and summary events of catalog builds.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`CatalogEvent`]: the structured event envelope. Engine code only ever
//!   publishes these; it never formats log lines itself.
//! - [`EventLogger`]: background subscriber that turns events into
//!   `tracing` records.

pub mod bus;
pub mod logger;

pub use bus::{CatalogEvent, EventBus, EventKind};
pub use logger::EventLogger;
