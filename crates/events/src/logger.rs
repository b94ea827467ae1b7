//! Tracing sink for catalog events.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every event as a structured `tracing` record. It runs as a
//! background task and exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{CatalogEvent, EventKind};

/// Background service that logs catalog events.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<CatalogEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &CatalogEvent) {
        match &event.kind {
            EventKind::BuildStarted {
                total,
                start,
                page_size,
            } => {
                tracing::info!(total, start, page_size, "Catalog build started");
            }
            EventKind::Progress { processed, total } => {
                tracing::info!(processed, total, "Workflows processed");
            }
            EventKind::PageCompleted {
                start,
                items,
                next_start,
                done,
            } => {
                tracing::debug!(start, items, next_start, done, "Page completed");
            }
            EventKind::SourceSkipped {
                workflow_id,
                stage,
                collection,
                error,
            } => {
                tracing::warn!(
                    workflow_id = %workflow_id,
                    stage = %stage,
                    collection = %collection,
                    error = %error,
                    "Source unavailable, continuing with partial results",
                );
            }
            EventKind::EntryDegraded {
                workflow_id,
                issues,
                error,
            } => {
                tracing::warn!(
                    workflow_id = %workflow_id,
                    issues,
                    error = %error,
                    "Workflow enrichment degraded"
                );
            }
            EventKind::DefinitionSkipped { reason } => {
                tracing::warn!(reason = %reason, "Workflow definition skipped");
            }
            EventKind::PageFailed { resume_from, error } => {
                tracing::error!(resume_from, error = %error, "Definition page failed");
            }
            EventKind::Cancelled { resume_from } => {
                tracing::info!(resume_from, "Catalog build cancelled");
            }
            EventKind::BuildFinished { summary } => {
                tracing::info!(
                    total_available = summary.total_available,
                    processed = summary.processed,
                    fully_enriched = summary.fully_enriched,
                    degraded = summary.degraded,
                    skipped = summary.skipped,
                    pages = summary.pages,
                    "Catalog build finished",
                );
            }
        }
    }
}
