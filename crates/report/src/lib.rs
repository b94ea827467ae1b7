//! Report renderers for a finished workflow catalog.
//!
//! Every renderer is a pure projection of a [`Catalog`]; nothing here
//! touches the record store.

use wfcat_core::{Catalog, CatalogEntry, HealthTag};

pub mod csv;
pub mod html;
pub mod json;

/// Output formats understood by [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    CsvSummary,
    CsvTriggers,
    CsvActivities,
    CsvUnused,
    Html,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvSummary => "csv-summary",
            Self::CsvTriggers => "csv-triggers",
            Self::CsvActivities => "csv-activities",
            Self::CsvUnused => "csv-unused",
            Self::Html => "html",
            Self::Json => "json",
        }
    }

    pub fn from_str_value(s: &str) -> Result<Self, ReportError> {
        match s {
            "csv-summary" => Ok(Self::CsvSummary),
            "csv-triggers" => Ok(Self::CsvTriggers),
            "csv-activities" => Ok(Self::CsvActivities),
            "csv-unused" => Ok(Self::CsvUnused),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(
        "Unknown report format '{0}'. Must be one of: csv-summary, csv-triggers, \
         csv-activities, csv-unused, html, json"
    )]
    UnknownFormat(String),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Render `catalog` in `format`.
pub fn render(format: ReportFormat, catalog: &Catalog) -> Result<String, ReportError> {
    match format {
        ReportFormat::CsvSummary => Ok(csv::summary(catalog)),
        ReportFormat::CsvTriggers => Ok(csv::triggers(catalog)),
        ReportFormat::CsvActivities => Ok(csv::activities(catalog)),
        ReportFormat::CsvUnused => Ok(csv::unused(catalog)),
        ReportFormat::Html => Ok(html::render(catalog)),
        ReportFormat::Json => json::render(catalog),
    }
}

/// Display status of an entry: unused wins over inactive.
pub(crate) fn status_label(entry: &CatalogEntry) -> &'static str {
    if entry.has_tag(HealthTag::PotentiallyUnused) {
        "Potentially Unused"
    } else if !entry.record.active {
        "Inactive"
    } else {
        "Active"
    }
}

/// Timestamp column text; empty when unknown.
pub(crate) fn format_timestamp(ts: Option<wfcat_core::Timestamp>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeSet;

    use wfcat_core::health::classify;
    use wfcat_core::types::parse_timestamp;
    use wfcat_core::{
        Activity, BuildSummary, Catalog, CatalogEntry, ClassifierConfig, DependencyMatrix,
        HealthSignals, Reference, ReferenceKind, Statistics, Trigger, TriggerKind,
        WorkflowRecord,
    };

    fn entry(record: WorkflowRecord, calls: Vec<String>) -> CatalogEntry {
        let tags: BTreeSet<_> =
            classify(&record, &HealthSignals::default(), &ClassifierConfig::default());
        CatalogEntry {
            record,
            tags,
            stuck_executions: 0,
            calls,
            issues: Vec::new(),
        }
    }

    /// Two workflows: a used one with a comma in its name and an unused one.
    pub fn catalog() -> Catalog {
        let mut used = WorkflowRecord::new("wf1", "Hire, onboard");
        used.target_table = "hr_case".to_string();
        used.description = "Says \"hello\"".to_string();
        used.created_at = parse_timestamp("2023-04-05 06:07:08");
        used.created_by = "admin".to_string();
        used.triggers = vec![Trigger {
            kind: TriggerKind::BusinessRule,
            name: "On insert".to_string(),
            table: "hr_case".to_string(),
            condition: "current.active".to_string(),
            when_clause: Some("after".to_string()),
            source_id: "br1".to_string(),
        }];
        used.activities = vec![
            Activity {
                name: "Begin".to_string(),
                type_name: "Begin".to_string(),
                order: 100,
                condition: String::new(),
                description: String::new(),
                source_id: "a1".to_string(),
            },
            Activity {
                name: "Launch child".to_string(),
                type_name: "Run Workflow".to_string(),
                order: 200,
                condition: String::new(),
                description: "Starts <child>".to_string(),
                source_id: "a2".to_string(),
            },
        ];
        used.statistics = Statistics::new(12, 1, parse_timestamp("2024-01-01 00:00:00"));
        used.references = vec![Reference {
            kind: ReferenceKind::ScriptInclude,
            name: "Helper".to_string(),
            table: None,
            source_id: "si1".to_string(),
        }];

        let mut unused = WorkflowRecord::new("wf2", "Legacy");
        unused.active = false;
        unused.target_table = "incident".to_string();

        let entries = vec![
            entry(used, vec!["wf2".to_string()]),
            entry(unused, Vec::new()),
        ];
        let dependencies =
            DependencyMatrix::from_forward(entries.iter().map(CatalogEntry::forward_edges));

        let summary = BuildSummary {
            total_available: 2,
            processed: 2,
            fully_enriched: 2,
            pages: 1,
            ..BuildSummary::default()
        };
        Catalog {
            generated_at: parse_timestamp("2024-06-01 12:00:00").unwrap(),
            entries,
            dependencies,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn format_names_round_trip() {
        for format in [
            ReportFormat::CsvSummary,
            ReportFormat::CsvTriggers,
            ReportFormat::CsvActivities,
            ReportFormat::CsvUnused,
            ReportFormat::Html,
            ReportFormat::Json,
        ] {
            assert_eq!(ReportFormat::from_str_value(format.as_str()).unwrap(), format);
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert_matches!(
            ReportFormat::from_str_value("xlsx"),
            Err(ReportError::UnknownFormat(f)) if f == "xlsx"
        );
    }

    #[test]
    fn status_prefers_unused_over_inactive() {
        let catalog = fixtures::catalog();
        assert_eq!(status_label(&catalog.entries[0]), "Active");
        assert_eq!(status_label(&catalog.entries[1]), "Potentially Unused");
    }
}
