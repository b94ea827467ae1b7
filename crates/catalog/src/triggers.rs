//! Trigger discovery: business rules and UI actions whose scripts start a
//! workflow by id.

use std::sync::Arc;

use futures::future::join_all;
use wfcat_core::{EnrichmentStage, Trigger, TriggerRegistry, TriggerSource};
use wfcat_db::{Filter, Query, Record, RecordStore};

use crate::error::Partial;

pub struct TriggerScanner {
    store: Arc<dyn RecordStore>,
    registry: TriggerRegistry,
}

impl TriggerScanner {
    pub fn new(store: Arc<dyn RecordStore>, registry: TriggerRegistry) -> Self {
        Self { store, registry }
    }

    /// Triggers in registry order, then natural collection order.
    pub async fn find_triggers(&self, workflow_id: &str) -> Partial<Vec<Trigger>> {
        let results = join_all(self.registry.sources().iter().map(|source| {
            let query = Query::new().filter(Filter::contains(source.script_field, workflow_id));
            async move { (source, self.store.query(source.collection, &query).await) }
        }))
        .await;

        let mut partial = Partial::complete(Vec::new());
        for (source, result) in results {
            match result {
                Ok(rows) => partial
                    .value
                    .extend(rows.iter().map(|row| to_trigger(source, row))),
                Err(e) => {
                    tracing::warn!(
                        workflow_id,
                        collection = source.collection,
                        error = %e,
                        "Trigger source unavailable, skipping",
                    );
                    partial.push_failure(EnrichmentStage::Triggers, e);
                }
            }
        }
        partial
    }
}

fn to_trigger(source: &TriggerSource, row: &Record) -> Trigger {
    let source_id = row.sys_id().unwrap_or_default();
    Trigger {
        kind: source.kind,
        name: row
            .non_blank(source.name_field)
            .unwrap_or_else(|| source_id.clone()),
        table: row.text_or_empty(source.table_field),
        condition: row.text_or_empty(source.condition_field),
        when_clause: source.when_field.map(|field| row.text_or_empty(field)),
        source_id,
    }
}
