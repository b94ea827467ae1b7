//! JSON report for machine consumption.

use serde::Serialize;
use wfcat_core::{
    BuildSummary, Catalog, EnrichmentIssue, HealthTag, Timestamp, WorkflowDependencies,
    WorkflowRecord,
};
use std::collections::BTreeSet;

use crate::ReportError;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_on: Timestamp,
    pub total_workflows: usize,
    pub summary: JsonSummary,
    pub build: &'a BuildSummary,
    pub workflows: Vec<JsonWorkflow<'a>>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct JsonSummary {
    pub active_workflows: usize,
    pub inactive_workflows: usize,
    pub potentially_unused: usize,
    pub degraded: usize,
    pub total_executions: u64,
}

#[derive(Debug, Serialize)]
pub struct JsonWorkflow<'a> {
    #[serde(flatten)]
    pub record: &'a WorkflowRecord,
    pub tags: &'a BTreeSet<HealthTag>,
    pub stuck_executions: u64,
    pub dependencies: WorkflowDependencies,
    pub issues: &'a [EnrichmentIssue],
}

impl<'a> JsonReport<'a> {
    pub fn from_catalog(catalog: &'a Catalog) -> Self {
        let mut summary = JsonSummary::default();
        for entry in &catalog.entries {
            if entry.record.active {
                summary.active_workflows += 1;
            } else {
                summary.inactive_workflows += 1;
            }
            if entry.has_tag(HealthTag::PotentiallyUnused) {
                summary.potentially_unused += 1;
            }
            if entry.is_degraded() {
                summary.degraded += 1;
            }
            summary.total_executions += entry.record.statistics.total_executions;
        }

        let workflows = catalog
            .entries
            .iter()
            .map(|entry| JsonWorkflow {
                record: &entry.record,
                tags: &entry.tags,
                stuck_executions: entry.stuck_executions,
                dependencies: catalog.dependencies.dependencies(&entry.record.id),
                issues: &entry.issues,
            })
            .collect();

        Self {
            generated_on: catalog.generated_at,
            total_workflows: catalog.entries.len(),
            summary,
            build: &catalog.summary,
            workflows,
        }
    }
}

/// Pretty-printed JSON report.
pub fn render(catalog: &Catalog) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(&JsonReport::from_catalog(catalog))?)
}
