//! Cross-reference discovery.
//!
//! For one workflow, every source in the [`ReferenceRegistry`] is searched
//! with a single text-contains query matching the workflow's id or name.
//! Sources are queried concurrently but results keep registry order, then
//! the collection's natural order. A failing source is skipped and reported
//! as an issue; the other sources still contribute.

use std::sync::Arc;

use futures::future::join_all;
use wfcat_core::{EnrichmentStage, Reference, ReferenceRegistry, ReferenceSource};
use wfcat_db::{Filter, Query, Record, RecordStore};

use crate::error::Partial;

pub struct ReferenceScanner {
    store: Arc<dyn RecordStore>,
    registry: ReferenceRegistry,
}

impl ReferenceScanner {
    pub fn new(store: Arc<dyn RecordStore>, registry: ReferenceRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Every record in the registry's sources that mentions the workflow.
    ///
    /// No deduplication happens across sources: a record found by two
    /// sources is reported twice.
    pub async fn find_references(
        &self,
        workflow_id: &str,
        workflow_name: &str,
    ) -> Partial<Vec<Reference>> {
        let needles = search_terms(workflow_id, workflow_name);

        let results = join_all(self.registry.sources().iter().map(|source| {
            let query =
                Query::new().filter(Filter::contains_any(source.text_field, needles.clone()));
            async move { (source, self.store.query(source.collection, &query).await) }
        }))
        .await;

        let mut partial = Partial::complete(Vec::new());
        for (source, result) in results {
            match result {
                Ok(rows) => partial
                    .value
                    .extend(rows.iter().map(|row| to_reference(source, row))),
                Err(e) => {
                    tracing::warn!(
                        workflow_id,
                        collection = source.collection,
                        error = %e,
                        "Reference source unavailable, skipping",
                    );
                    partial.push_failure(EnrichmentStage::References, e);
                }
            }
        }
        partial
    }
}

/// Id plus name, without blanks or duplicates.
fn search_terms(workflow_id: &str, workflow_name: &str) -> Vec<String> {
    let mut terms = vec![workflow_id.to_string()];
    if !workflow_name.trim().is_empty() && workflow_name != workflow_id {
        terms.push(workflow_name.to_string());
    }
    terms
}

fn to_reference(source: &ReferenceSource, row: &Record) -> Reference {
    let source_id = row.sys_id().unwrap_or_default();
    let name = source
        .name_field
        .and_then(|field| row.non_blank(field))
        .unwrap_or_else(|| source_id.clone());
    Reference {
        kind: source.kind,
        name,
        table: source.table_field.and_then(|field| row.non_blank(field)),
        source_id,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
