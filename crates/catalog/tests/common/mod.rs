//! Shared fixtures for catalog integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wfcat_catalog::WorkflowCatalogBuilder;
use wfcat_db::{Aggregate, Filter, MemoryRecordStore, Query, Record, RecordStore, StoreError};

/// Published, active definitions `wf00..wf{n-1}` named `Workflow 00..`.
pub fn definitions(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "sys_id": format!("wf{i:02}"),
                "name": format!("Workflow {i:02}"),
                "published": true,
                "active": true,
            })
        })
        .collect()
}

pub fn store_with_definitions(n: usize) -> MemoryRecordStore {
    MemoryRecordStore::new().with_records("wf_workflow_version", definitions(n))
}

pub fn builder(store: Arc<MemoryRecordStore>) -> WorkflowCatalogBuilder {
    WorkflowCatalogBuilder::new(store)
}

pub fn activity(id: &str, workflow: &str, type_name: &str, order: i64) -> Value {
    json!({
        "sys_id": id,
        "workflow_version": workflow,
        "name": format!("{type_name} {order}"),
        "order": order,
        "activity_definition": {"name": type_name},
    })
}

pub fn run_workflow_target(activity: &str, target: &str) -> Value {
    json!({"activity": activity, "variable": {"name": "workflow"}, "value": target})
}

pub fn ids(entries: &[wfcat_core::CatalogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.record.id.clone()).collect()
}

/// Store whose definition scan fails after a number of successful pages.
pub struct FlakyDefinitions {
    inner: MemoryRecordStore,
    healthy_pages: usize,
    pages_served: AtomicUsize,
}

impl FlakyDefinitions {
    pub fn new(inner: MemoryRecordStore, healthy_pages: usize) -> Self {
        Self {
            inner,
            healthy_pages,
            pages_served: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyDefinitions {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        if collection == "wf_workflow_version"
            && self.pages_served.fetch_add(1, Ordering::SeqCst) >= self.healthy_pages
        {
            return Err(StoreError::Unavailable {
                collection: collection.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.inner.query(collection, query).await
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        self.inner.count(collection, filters).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        filters: &[Filter],
        function: &Aggregate,
    ) -> Result<Option<Value>, StoreError> {
        self.inner.aggregate(collection, filters, function).await
    }
}

/// Store that fires a cancellation token once a number of definition pages
/// have been served.
pub struct CancelAfterPages {
    inner: MemoryRecordStore,
    pages: usize,
    pages_served: AtomicUsize,
    cancel: CancellationToken,
}

impl CancelAfterPages {
    pub fn new(inner: MemoryRecordStore, pages: usize, cancel: CancellationToken) -> Self {
        Self {
            inner,
            pages,
            pages_served: AtomicUsize::new(0),
            cancel,
        }
    }
}

#[async_trait]
impl RecordStore for CancelAfterPages {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        let rows = self.inner.query(collection, query).await;
        if collection == "wf_workflow_version"
            && self.pages_served.fetch_add(1, Ordering::SeqCst) + 1 >= self.pages
        {
            self.cancel.cancel();
        }
        rows
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        self.inner.count(collection, filters).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        filters: &[Filter],
        function: &Aggregate,
    ) -> Result<Option<Value>, StoreError> {
        self.inner.aggregate(collection, filters, function).await
    }
}
