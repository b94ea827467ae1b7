use crate::types::SysId;

/// Failure taxonomy of the catalog engine.
///
/// Only `StoreUnavailable` on the primary definition scan is fatal to a
/// page; every other variant is recorded against the affected entry and
/// processing continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Store unavailable for {collection}: {message}")]
    StoreUnavailable { collection: String, message: String },

    #[error("Malformed record {source_id} in {collection}: missing {field}")]
    MalformedRecord {
        collection: String,
        source_id: SysId,
        field: &'static str,
    },

    #[error("Incomplete enrichment for workflow {workflow_id}: {failed_stages} stage(s) degraded")]
    IncompleteEnrichment {
        workflow_id: SysId,
        failed_stages: usize,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CatalogError {
    /// Build a `StoreUnavailable` error for a collection.
    pub fn store_unavailable(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            collection: collection.into(),
            message: message.into(),
        }
    }
}
