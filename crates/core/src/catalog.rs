//! Finished catalog snapshot handed to renderers.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::dependency::{DependencyMatrix, ForwardEdges};
use crate::error::CatalogError;
use crate::health::HealthTag;
use crate::types::{SysId, Timestamp};
use crate::workflow::WorkflowRecord;

// ---------------------------------------------------------------------------
// Enrichment issues
// ---------------------------------------------------------------------------

/// Enrichment stage of a single workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStage {
    Definition,
    Triggers,
    Activities,
    References,
    Dependencies,
    Statistics,
    StuckProbe,
}

impl EnrichmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::Triggers => "triggers",
            Self::Activities => "activities",
            Self::References => "references",
            Self::Dependencies => "dependencies",
            Self::Statistics => "statistics",
            Self::StuckProbe => "stuck_probe",
        }
    }
}

/// Something that kept a workflow from being fully enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentIssue {
    pub stage: EnrichmentStage,
    #[serde(serialize_with = "serialize_error")]
    pub error: CatalogError,
}

impl EnrichmentIssue {
    pub fn new(stage: EnrichmentStage, error: CatalogError) -> Self {
        Self { stage, error }
    }
}

fn serialize_error<S: serde::Serializer>(err: &CatalogError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&err.to_string())
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One enriched workflow together with its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub record: WorkflowRecord,
    pub tags: BTreeSet<HealthTag>,
    pub stuck_executions: u64,
    /// Phase-1 dependency scan: workflows this one invokes, possibly with
    /// duplicates. The catalog's [`DependencyMatrix`] is the deduplicated view.
    #[serde(skip)]
    pub calls: Vec<SysId>,
    pub issues: Vec<EnrichmentIssue>,
}

impl CatalogEntry {
    pub fn forward_edges(&self) -> ForwardEdges {
        ForwardEdges::new(self.record.id.clone(), self.calls.clone())
    }

    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_tag(&self, tag: HealthTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Summary error for a degraded entry.
    pub fn degradation(&self) -> Option<CatalogError> {
        if self.issues.is_empty() {
            return None;
        }
        let stages: BTreeSet<EnrichmentStage> = self.issues.iter().map(|i| i.stage).collect();
        Some(CatalogError::IncompleteEnrichment {
            workflow_id: self.record.id.clone(),
            failed_stages: stages.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Counts reported at the end of every build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Matching definitions according to the count query at build start.
    pub total_available: u64,
    /// Entries produced.
    pub processed: u64,
    pub fully_enriched: u64,
    pub degraded: u64,
    /// Definition rows without an identifier; counted, never emitted.
    pub skipped: u64,
    pub pages: u64,
}

impl BuildSummary {
    /// Account for one produced entry.
    pub fn record_entry(&mut self, entry: &CatalogEntry) {
        self.processed += 1;
        if entry.is_degraded() {
            self.degraded += 1;
        } else {
            self.fully_enriched += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub generated_at: Timestamp,
    pub entries: Vec<CatalogEntry>,
    pub dependencies: DependencyMatrix,
    pub summary: BuildSummary,
}

impl Catalog {
    pub fn records(&self) -> impl Iterator<Item = &WorkflowRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn entry(&self, workflow_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.record.id == workflow_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn entry(issues: Vec<EnrichmentIssue>) -> CatalogEntry {
        CatalogEntry {
            record: WorkflowRecord::new("wf1", "Workflow"),
            tags: BTreeSet::new(),
            stuck_executions: 0,
            calls: Vec::new(),
            issues,
        }
    }

    #[test]
    fn summary_splits_full_and_degraded() {
        let mut summary = BuildSummary::default();
        summary.record_entry(&entry(Vec::new()));
        summary.record_entry(&entry(vec![EnrichmentIssue::new(
            EnrichmentStage::References,
            CatalogError::store_unavailable("sys_script_include", "timeout"),
        )]));
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.fully_enriched, 1);
        assert_eq!(summary.degraded, 1);
    }

    #[test]
    fn degradation_counts_distinct_stages() {
        let e = entry(vec![
            EnrichmentIssue::new(
                EnrichmentStage::References,
                CatalogError::store_unavailable("a", "down"),
            ),
            EnrichmentIssue::new(
                EnrichmentStage::References,
                CatalogError::store_unavailable("b", "down"),
            ),
            EnrichmentIssue::new(
                EnrichmentStage::Statistics,
                CatalogError::store_unavailable("wf_context", "down"),
            ),
        ]);
        assert_matches!(
            e.degradation(),
            Some(CatalogError::IncompleteEnrichment { failed_stages: 2, .. })
        );
        assert!(entry(Vec::new()).degradation().is_none());
    }
}
