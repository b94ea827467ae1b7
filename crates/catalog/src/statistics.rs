//! Execution statistics and the stuck-execution probe.
//!
//! Both read the execution context collection through count and aggregate
//! calls only; no context rows are materialized.

use std::sync::Arc;

use chrono::Duration;
use wfcat_core::collections::{
    CONTEXT, FIELD_CREATED_ON, FIELD_STATE, FIELD_WORKFLOW_VERSION, STATE_EXECUTING,
};
use wfcat_core::types::parse_timestamp;
use wfcat_core::{EnrichmentStage, Statistics, Timestamp};
use wfcat_db::store::value_text;
use wfcat_db::{Aggregate, Filter, RecordStore, StoreError};

use crate::error::Partial;

fn contexts_of(workflow_id: &str) -> Filter {
    Filter::eq(FIELD_WORKFLOW_VERSION, workflow_id)
}

fn executing() -> Filter {
    Filter::eq(FIELD_STATE, STATE_EXECUTING)
}

// ---------------------------------------------------------------------------
// StatisticsAggregator
// ---------------------------------------------------------------------------

pub struct StatisticsAggregator {
    store: Arc<dyn RecordStore>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Run the three context queries concurrently.
    ///
    /// Each failing query defaults its field (0 or no timestamp) and adds
    /// an issue.
    pub async fn compute_statistics(&self, workflow_id: &str) -> Partial<Statistics> {
        let all = [contexts_of(workflow_id)];
        let active = [contexts_of(workflow_id), executing()];
        let last_run = Aggregate::Max(FIELD_CREATED_ON.to_string());

        let (total, running, last) = tokio::join!(
            self.store.count(CONTEXT, &all),
            self.store.count(CONTEXT, &active),
            self.store.aggregate(CONTEXT, &all, &last_run),
        );

        let mut issues = Partial::complete(());
        let total = recover(total, workflow_id, &mut issues).unwrap_or(0);
        let running = recover(running, workflow_id, &mut issues).unwrap_or(0);
        let last_executed_at = recover(last, workflow_id, &mut issues)
            .flatten()
            .as_ref()
            .and_then(value_text)
            .as_deref()
            .and_then(parse_timestamp);

        Partial {
            value: Statistics::new(total, running, last_executed_at),
            issues: issues.issues,
        }
    }
}

fn recover<T>(
    result: Result<T, StoreError>,
    workflow_id: &str,
    partial: &mut Partial<()>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(workflow_id, error = %e, "Statistics query failed, using default");
            partial.push_failure(EnrichmentStage::Statistics, e);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// StuckExecutionProbe
// ---------------------------------------------------------------------------

/// Counts executing contexts older than a threshold.
pub struct StuckExecutionProbe {
    store: Arc<dyn RecordStore>,
    stuck_after: Duration,
}

impl StuckExecutionProbe {
    pub fn new(store: Arc<dyn RecordStore>, stuck_after: Duration) -> Self {
        Self { store, stuck_after }
    }

    /// Executing contexts of `workflow_id` created before `now - stuck_after`.
    ///
    /// A cutoff earlier than the earliest representable instant matches
    /// nothing, so the store is not queried.
    pub async fn probe(&self, workflow_id: &str, now: Timestamp) -> Result<u64, StoreError> {
        let Some(cutoff) = now.checked_sub_signed(self.stuck_after) else {
            return Ok(0);
        };
        let filters = [
            contexts_of(workflow_id),
            executing(),
            Filter::before(FIELD_CREATED_ON, cutoff),
        ];
        self.store.count(CONTEXT, &filters).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wfcat_db::memory::CallKind;
    use wfcat_db::MemoryRecordStore;

    fn store() -> Arc<MemoryRecordStore> {
        Arc::new(MemoryRecordStore::new().with_records(
            "wf_context",
            [
                json!({"workflow_version": "wf1", "state": "finished", "sys_created_on": "2024-05-01 08:00:00"}),
                json!({"workflow_version": "wf1", "state": "executing", "sys_created_on": "2024-05-03 12:00:00"}),
                json!({"workflow_version": "wf1", "state": "executing", "sys_created_on": "2024-05-01 09:00:00"}),
                json!({"workflow_version": "wf2", "state": "executing", "sys_created_on": "2024-04-01 00:00:00"}),
            ],
        ))
    }

    #[tokio::test]
    async fn counts_and_last_run() {
        let store = store();
        let stats = StatisticsAggregator::new(store.clone())
            .compute_statistics("wf1")
            .await;

        assert!(stats.is_complete());
        assert_eq!(stats.value.total_executions, 3);
        assert_eq!(stats.value.active_executions, 2);
        assert_eq!(
            stats.value.last_executed_at,
            parse_timestamp("2024-05-03 12:00:00")
        );
        assert_eq!(store.calls("wf_context", CallKind::Query), 0);
    }

    #[tokio::test]
    async fn never_executed_workflow_has_empty_statistics() {
        let stats = StatisticsAggregator::new(store())
            .compute_statistics("wf9")
            .await;
        assert_eq!(stats.value, Statistics::default());
    }

    #[tokio::test]
    async fn failure_defaults_every_field() {
        let store = store();
        store.fail_collection("wf_context");
        let stats = StatisticsAggregator::new(store).compute_statistics("wf1").await;

        assert_eq!(stats.value, Statistics::default());
        assert_eq!(stats.issues.len(), 3);
        assert!(stats
            .issues
            .iter()
            .all(|i| i.stage == EnrichmentStage::Statistics));
    }

    #[tokio::test]
    async fn probe_counts_only_old_executing_contexts() {
        let probe = StuckExecutionProbe::new(store(), Duration::hours(24));
        let now = parse_timestamp("2024-05-03 18:00:00").unwrap();

        assert_eq!(probe.probe("wf1", now).await.unwrap(), 1);
        assert_eq!(probe.probe("wf2", now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn probe_threshold_is_configurable() {
        let probe = StuckExecutionProbe::new(store(), Duration::hours(1));
        let now = parse_timestamp("2024-05-03 18:00:00").unwrap();
        assert_eq!(probe.probe("wf1", now).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unreachable_stuck_cutoff_counts_nothing() {
        let store = store();
        let probe = StuckExecutionProbe::new(store.clone(), Duration::hours(10_000_000_000));
        let now = parse_timestamp("2024-05-03 18:00:00").unwrap();

        assert_eq!(probe.probe("wf1", now).await.unwrap(), 0);
        assert_eq!(store.calls("wf_context", CallKind::Count), 0);
    }
}
