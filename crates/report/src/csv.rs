//! CSV projections: one row per workflow, trigger, or activity.

use wfcat_core::{Catalog, CatalogEntry};

use crate::{format_timestamp, status_label};

pub const SUMMARY_HEADER: &[&str] = &[
    "Name",
    "Table",
    "Description",
    "Active",
    "Created",
    "Created By",
    "Updated",
    "Updated By",
    "Total Executions",
    "Active Contexts",
    "Last Executed",
    "Triggers Count",
    "Activities Count",
    "References Count",
    "Status",
];

pub const TRIGGERS_HEADER: &[&str] = &[
    "Workflow Name",
    "Workflow Table",
    "Trigger Type",
    "Trigger Name",
    "Trigger Table",
    "When",
    "Condition",
];

pub const ACTIVITIES_HEADER: &[&str] = &[
    "Workflow Name",
    "Activity Order",
    "Activity Name",
    "Activity Type",
    "Condition",
    "Description",
];

pub const UNUSED_HEADER: &[&str] = &[
    "Name",
    "Table",
    "Created",
    "Created By",
    "Last Updated",
    "Reason",
];

/// Placeholder for a workflow that has never run.
const NEVER_EXECUTED: &str = "Never";

/// Placeholder trigger type for workflows without triggers.
const NO_TRIGGERS: &str = "No Triggers";

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

pub fn summary(catalog: &Catalog) -> String {
    let mut csv = header(SUMMARY_HEADER);
    for entry in &catalog.entries {
        let wf = &entry.record;
        let stats = &wf.statistics;
        let last_executed = match stats.last_executed_at {
            Some(ts) => format_timestamp(Some(ts)),
            None => NEVER_EXECUTED.to_string(),
        };
        push_row(
            &mut csv,
            &[
                wf.name.clone(),
                wf.target_table.clone(),
                wf.description.clone(),
                wf.active.to_string(),
                format_timestamp(wf.created_at),
                wf.created_by.clone(),
                format_timestamp(wf.updated_at),
                wf.updated_by.clone(),
                stats.total_executions.to_string(),
                stats.active_executions.to_string(),
                last_executed,
                wf.triggers.len().to_string(),
                wf.activities.len().to_string(),
                wf.references.len().to_string(),
                status_label(entry).to_string(),
            ],
        );
    }
    csv
}

/// One row per trigger; a workflow without triggers gets a placeholder row.
pub fn triggers(catalog: &Catalog) -> String {
    let mut csv = header(TRIGGERS_HEADER);
    for entry in &catalog.entries {
        let wf = &entry.record;
        if wf.triggers.is_empty() {
            push_row(
                &mut csv,
                &[
                    wf.name.clone(),
                    wf.target_table.clone(),
                    NO_TRIGGERS.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ],
            );
            continue;
        }
        for trigger in &wf.triggers {
            push_row(
                &mut csv,
                &[
                    wf.name.clone(),
                    wf.target_table.clone(),
                    trigger.kind.label().to_string(),
                    trigger.name.clone(),
                    trigger.table.clone(),
                    trigger.when_clause.clone().unwrap_or_default(),
                    trigger.condition.clone(),
                ],
            );
        }
    }
    csv
}

/// One row per activity, in execution order.
pub fn activities(catalog: &Catalog) -> String {
    let mut csv = header(ACTIVITIES_HEADER);
    for entry in &catalog.entries {
        let wf = &entry.record;
        for activity in &wf.activities {
            push_row(
                &mut csv,
                &[
                    wf.name.clone(),
                    activity.order.to_string(),
                    activity.name.clone(),
                    activity.type_name.clone(),
                    activity.condition.clone(),
                    activity.description.clone(),
                ],
            );
        }
    }
    csv
}

/// Workflows with at least one sign of disuse, with every reason listed.
pub fn unused(catalog: &Catalog) -> String {
    let mut csv = header(UNUSED_HEADER);
    for entry in &catalog.entries {
        let reasons = unused_reasons(entry);
        if reasons.is_empty() {
            continue;
        }
        let wf = &entry.record;
        push_row(
            &mut csv,
            &[
                wf.name.clone(),
                wf.target_table.clone(),
                format_timestamp(wf.created_at),
                wf.created_by.clone(),
                format_timestamp(wf.updated_at),
                reasons.join(", "),
            ],
        );
    }
    csv
}

pub fn unused_reasons(entry: &CatalogEntry) -> Vec<&'static str> {
    let wf = &entry.record;
    let mut reasons = Vec::new();
    if wf.triggers.is_empty() {
        reasons.push("No Triggers");
    }
    if wf.statistics.never_executed() {
        reasons.push("Never Executed");
    }
    if wf.references.is_empty() {
        reasons.push("No References");
    }
    if !wf.active {
        reasons.push("Inactive");
    }
    reasons
}

// ---------------------------------------------------------------------------
// CSV helpers
// ---------------------------------------------------------------------------

/// Escape a value for CSV: wrap in quotes if it contains comma, quote, or newline.
pub fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn header(columns: &[&str]) -> String {
    let mut line = columns.join(",");
    line.push('\n');
    line
}

fn push_row(csv: &mut String, cells: &[String]) {
    let escaped: Vec<String> = cells.iter().map(|c| csv_escape(c)).collect();
    csv.push_str(&escaped.join(","));
    csv.push('\n');
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn lines(csv: &str) -> Vec<&str> {
        csv.lines().collect()
    }

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn summary_has_one_row_per_workflow() {
        let csv = summary(&fixtures::catalog());
        let rows = lines(&csv);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], SUMMARY_HEADER.join(","));
        assert!(rows[1].starts_with("\"Hire, onboard\",hr_case,\"Says \"\"hello\"\"\",true,"));
        assert!(rows[1].ends_with(",12,1,2024-01-01 00:00:00,1,2,1,Active"));
        assert!(rows[2].contains(",0,0,Never,0,0,0,"));
        assert!(rows[2].ends_with("Potentially Unused"));
    }

    #[test]
    fn workflow_without_triggers_gets_placeholder_row() {
        let csv = triggers(&fixtures::catalog());
        let rows = lines(&csv);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            "\"Hire, onboard\",hr_case,Business Rule,On insert,hr_case,after,current.active"
        );
        assert_eq!(rows[2], "Legacy,incident,No Triggers,,,,");
    }

    #[test]
    fn activities_list_in_order() {
        let csv = activities(&fixtures::catalog());
        let rows = lines(&csv);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].contains(",100,Begin,Begin,"));
        assert!(rows[2].contains(",200,Launch child,Run Workflow,"));
    }

    #[test]
    fn unused_lists_every_reason() {
        let csv = unused(&fixtures::catalog());
        let rows = lines(&csv);
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("Legacy,incident,"));
        assert!(rows[1].ends_with("\"No Triggers, Never Executed, No References, Inactive\""));
    }
}
