//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the catalog builder
//! (publisher) and any number of sinks (subscribers).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use wfcat_core::{BuildSummary, SysId};

// ---------------------------------------------------------------------------
// CatalogEvent
// ---------------------------------------------------------------------------

/// What happened during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A build began; `total` is the count of matching definitions.
    BuildStarted { total: u64, start: u64, page_size: u64 },

    /// Emitted every ten consumed items.
    Progress { processed: u64, total: u64 },

    PageCompleted {
        start: u64,
        items: u64,
        next_start: u64,
        done: bool,
    },

    /// A non-primary source failed; the stage continues with partial data.
    SourceSkipped {
        workflow_id: SysId,
        stage: String,
        collection: String,
        error: String,
    },

    /// An entry finished with at least one issue. `error` summarizes the
    /// failed stages.
    EntryDegraded {
        workflow_id: SysId,
        issues: usize,
        error: String,
    },

    /// A definition row could not be processed at all.
    DefinitionSkipped { reason: String },

    /// The primary scan failed; the build can resume from `resume_from`.
    PageFailed { resume_from: u64, error: String },

    /// External cancellation stopped the build between pages.
    Cancelled { resume_from: u64 },

    BuildFinished { summary: BuildSummary },
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEvent {
    #[serde(flatten)]
    pub kind: EventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl CatalogEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

impl From<EventKind> for CatalogEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use wfcat_events::bus::{EventBus, EventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(EventKind::Progress { processed: 10, total: 40 });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: impl Into<CatalogEvent>) {
        // A send error only means there are no receivers.
        let _ = self.sender.send(event.into());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
