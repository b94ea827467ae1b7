//! Workflow-to-workflow call edges.
//!
//! Phase 1 ([`DependencyResolver::find_dependencies`]) reads one workflow's
//! "Run Workflow" activities and their `workflow` variable. Phase 2 is the
//! pure inversion in [`DependencyMatrix::from_forward`], run only after
//! every phase-1 list is available.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use wfcat_core::collections::{
    ACTIVITY, ACTIVITY_TYPE_RUN_WORKFLOW, FIELD_ACTIVITY, FIELD_ACTIVITY_TYPE, FIELD_ORDER,
    FIELD_VALUE, FIELD_VARIABLE_NAME, FIELD_WORKFLOW_VERSION, VARIABLE_VALUE, VARIABLE_WORKFLOW,
};
use wfcat_core::{CatalogError, DependencyMatrix, ForwardEdges, SysId};
use wfcat_db::{Filter, OrderBy, Query, RecordStore, StoreError};

/// Default number of workflows resolved at once by [`DependencyResolver::build_matrix`].
pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct DependencyResolver {
    store: Arc<dyn RecordStore>,
    concurrency: usize,
}

/// Matrix over a set of workflows plus the ids whose phase-1 scan failed.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixBuild {
    pub matrix: DependencyMatrix,
    pub failures: BTreeMap<SysId, CatalogError>,
}

impl DependencyResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound on concurrent phase-1 scans; values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Phase 1: workflows invoked by `workflow_id`, in activity order.
    ///
    /// A "Run Workflow" activity without a `workflow` value contributes no
    /// edge. Duplicates are kept; the matrix collapses them.
    pub async fn find_dependencies(&self, workflow_id: &str) -> Result<ForwardEdges, StoreError> {
        let activities = Query::new()
            .filter(Filter::eq(FIELD_WORKFLOW_VERSION, workflow_id))
            .filter(Filter::eq(FIELD_ACTIVITY_TYPE, ACTIVITY_TYPE_RUN_WORKFLOW))
            .order_by(OrderBy::asc(FIELD_ORDER).numeric());
        let rows = self.store.query(ACTIVITY, &activities).await?;

        let mut calls = Vec::new();
        for activity_id in rows.iter().filter_map(|row| row.sys_id()) {
            let variable = Query::new()
                .filter(Filter::eq(FIELD_ACTIVITY, activity_id.as_str()))
                .filter(Filter::eq(FIELD_VARIABLE_NAME, VARIABLE_WORKFLOW))
                .limit(1);
            let values = self.store.query(VARIABLE_VALUE, &variable).await?;
            match values.first().and_then(|v| v.non_blank(FIELD_VALUE)) {
                Some(target) => calls.push(target),
                None => tracing::debug!(
                    workflow_id,
                    activity_id = %activity_id,
                    "Run Workflow activity has no target",
                ),
            }
        }

        Ok(ForwardEdges::new(workflow_id, calls))
    }

    /// Phase 1 for every id with bounded concurrency, then phase 2.
    ///
    /// A failed phase-1 scan leaves that workflow without outgoing edges
    /// and is reported in [`MatrixBuild::failures`].
    pub async fn build_matrix(&self, workflow_ids: &[SysId]) -> MatrixBuild {
        let results: Vec<(SysId, Result<ForwardEdges, StoreError>)> =
            futures::stream::iter(workflow_ids)
                .map(|id| async move { (id.clone(), self.find_dependencies(id).await) })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut lists = Vec::with_capacity(results.len());
        let mut failures = BTreeMap::new();
        for (id, result) in results {
            match result {
                Ok(edges) => lists.push(edges),
                Err(e) => {
                    tracing::warn!(workflow_id = %id, error = %e, "Dependency scan failed");
                    lists.push(ForwardEdges::new(id.clone(), Vec::new()));
                    failures.insert(id, e.into());
                }
            }
        }

        MatrixBuild {
            matrix: DependencyMatrix::from_forward(lists),
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wfcat_db::MemoryRecordStore;

    fn run_workflow(id: &str, version: &str, order: u32) -> Value {
        json!({"sys_id": id, "workflow_version": version, "order": order,
               "activity_definition": {"name": "Run Workflow"}})
    }

    fn target(activity: &str, value: &str) -> Value {
        json!({"activity": activity, "variable": {"name": "workflow"}, "value": value})
    }

    fn store() -> MemoryRecordStore {
        MemoryRecordStore::new()
            .with_records(
                "wf_activity",
                [
                    run_workflow("a2", "A", 200),
                    run_workflow("a1", "A", 100),
                    json!({"sys_id": "a3", "workflow_version": "A",
                           "activity_definition": {"name": "Approval - User"}}),
                    run_workflow("b1", "B", 100),
                    run_workflow("b2", "B", 200),
                ],
            )
            .with_records(
                "wf_variable_value",
                [
                    target("a1", "B"),
                    target("a2", "C"),
                    json!({"activity": "a2", "variable": {"name": "timeout"}, "value": "60"}),
                    target("b1", "C"),
                    target("b2", "C"),
                    target("a3", "Z"),
                ],
            )
    }

    #[tokio::test]
    async fn forward_edges_follow_activity_order() {
        let resolver = DependencyResolver::new(Arc::new(store()));
        let edges = resolver.find_dependencies("A").await.unwrap();
        assert_eq!(edges.calls, ["B", "C"]);
    }

    #[tokio::test]
    async fn duplicates_survive_phase_one() {
        let resolver = DependencyResolver::new(Arc::new(store()));
        let edges = resolver.find_dependencies("B").await.unwrap();
        assert_eq!(edges.calls, ["C", "C"]);
    }

    #[tokio::test]
    async fn missing_variable_omits_the_edge() {
        let store = MemoryRecordStore::new()
            .with_records("wf_activity", [run_workflow("x1", "X", 1)]);
        let resolver = DependencyResolver::new(Arc::new(store));
        let edges = resolver.find_dependencies("X").await.unwrap();
        assert!(edges.calls.is_empty());
    }

    #[tokio::test]
    async fn matrix_is_symmetric() {
        let resolver = DependencyResolver::new(Arc::new(store())).with_concurrency(2);
        let build = resolver
            .build_matrix(&["A".to_string(), "B".to_string()])
            .await;

        assert!(build.failures.is_empty());
        for edge in build.matrix.edges() {
            let target = build.matrix.dependencies(&edge.to);
            assert!(target.called_by_workflows.contains(&edge.from));
        }
        assert_eq!(build.matrix.dependencies("C").called_by_workflows, ["A", "B"]);
        assert_eq!(build.matrix.dependencies("B").calls_workflows, ["C"]);
    }

    #[tokio::test]
    async fn failed_scan_is_reported_per_workflow() {
        let store = store();
        store.fail_collection("wf_variable_value");
        let resolver = DependencyResolver::new(Arc::new(store));

        let build = resolver.build_matrix(&["A".to_string()]).await;

        assert!(build.failures.contains_key("A"));
        assert!(build.matrix.dependencies("A").calls_workflows.is_empty());
    }
}
