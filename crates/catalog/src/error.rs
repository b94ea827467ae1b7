use wfcat_core::{CatalogError, EnrichmentIssue, EnrichmentStage};
use wfcat_db::StoreError;

/// Errors that stop a build before or between pages.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid page size {0}: must be at least 1")]
    InvalidPageSize(u64),

    #[error("Invalid concurrency {0}: must be at least 1")]
    InvalidConcurrency(usize),

    /// The primary definition scan failed. Completed pages stay valid and
    /// the scan can be resumed from `resume_from`.
    #[error("Definition scan failed at offset {resume_from}: {source}")]
    DefinitionScan {
        resume_from: u64,
        #[source]
        source: StoreError,
    },
}

/// Why a build stopped before the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interruption {
    /// The cancellation token fired.
    Cancelled { resume_from: u64 },
    /// A definition page could not be fetched.
    StoreUnavailable { resume_from: u64, error: CatalogError },
}

impl Interruption {
    /// Offset of the first definition not yet processed.
    pub fn resume_from(&self) -> u64 {
        match self {
            Self::Cancelled { resume_from } | Self::StoreUnavailable { resume_from, .. } => {
                *resume_from
            }
        }
    }
}

/// Result of one enrichment stage that tolerates source failures.
///
/// `value` holds whatever the healthy sources returned; every failed
/// source contributes one issue.
#[derive(Debug, Clone, PartialEq)]
pub struct Partial<T> {
    pub value: T,
    pub issues: Vec<EnrichmentIssue>,
}

impl<T> Partial<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            issues: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    /// Record a failed source against `stage`.
    pub fn push_failure(&mut self, stage: EnrichmentStage, err: StoreError) {
        self.issues.push(EnrichmentIssue::new(stage, err.into()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn unavailable(collection: &str) -> StoreError {
        StoreError::Unavailable {
            collection: collection.to_string(),
            reason: "down".to_string(),
        }
    }

    #[test]
    fn failure_keeps_partial_value() {
        let mut partial = Partial::complete(vec![1u8]);
        assert!(partial.is_complete());

        partial.push_failure(EnrichmentStage::Activities, unavailable("wf_activity"));
        assert_eq!(partial.value, [1]);
        assert!(!partial.is_complete());
        assert_matches!(
            &partial.issues[0].error,
            CatalogError::StoreUnavailable { collection, .. } if collection == "wf_activity"
        );
    }

    #[test]
    fn interruption_exposes_resume_offset() {
        assert_eq!(Interruption::Cancelled { resume_from: 40 }.resume_from(), 40);
        let failed = Interruption::StoreUnavailable {
            resume_from: 10,
            error: CatalogError::store_unavailable("wf_workflow_version", "timeout"),
        };
        assert_eq!(failed.resume_from(), 10);
    }
}
