//! Standalone HTML document with one section per workflow.

use std::fmt::Write;

use wfcat_core::{Catalog, CatalogEntry, HealthTag};

use crate::format_timestamp;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.workflow { border: 1px solid #ddd; margin: 20px 0; padding: 15px; }
.workflow-header { background: #f5f5f5; padding: 10px; margin: -15px -15px 15px -15px; }
.section { margin: 10px 0; }
.section-title { font-weight: bold; color: #333; }
.trigger, .activity { margin: 5px 0; padding: 5px; background: #f9f9f9; }
.stats { display: flex; gap: 20px; }
.stat { background: #e3f2fd; padding: 10px; border-radius: 4px; }
.tag { display: inline-block; margin-right: 6px; font-size: 0.85em; color: #555; }
.unused { border-left: 5px solid #f44336; }
.active { border-left: 5px solid #4caf50; }
";

/// Escape text for use in element content and attribute values.
pub fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render(catalog: &Catalog) -> String {
    let mut html = String::new();
    // Writing to a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Workflow Documentation</title>\n\
         <style>\n{STYLE}</style>\n</head>\n<body>\n\
         <h1>Workflow Documentation</h1>\n\
         <p>Generated on: {}</p>\n<p>Total Workflows: {}</p>\n",
        format_timestamp(Some(catalog.generated_at)),
        catalog.entries.len(),
    );
    for entry in &catalog.entries {
        render_entry(&mut html, catalog, entry);
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_entry(html: &mut String, catalog: &Catalog, entry: &CatalogEntry) {
    let wf = &entry.record;
    let class = if entry.has_tag(HealthTag::PotentiallyUnused) {
        "unused"
    } else {
        "active"
    };

    let _ = write!(
        html,
        "<div class=\"workflow {class}\" id=\"{}\">\n<div class=\"workflow-header\">\n\
         <h2>{}</h2>\n<p><strong>Table:</strong> {} | <strong>Active:</strong> {}</p>\n",
        html_escape(&wf.id),
        html_escape(&wf.name),
        html_escape(&wf.target_table),
        wf.active,
    );
    for tag in &entry.tags {
        let _ = write!(html, "<span class=\"tag\">{tag}</span>");
    }
    html.push_str("\n</div>\n");

    let description = if wf.description.trim().is_empty() {
        "No description provided".to_string()
    } else {
        html_escape(&wf.description)
    };
    let _ = write!(
        html,
        "<div class=\"section\">\n<div class=\"section-title\">Description:</div>\n<p>{description}</p>\n</div>\n",
    );

    let stats = &wf.statistics;
    let last = stats
        .last_executed_at
        .map(|t| format_timestamp(Some(t)))
        .unwrap_or_else(|| "Never".to_string());
    let _ = write!(
        html,
        "<div class=\"section\">\n<div class=\"section-title\">Statistics:</div>\n<div class=\"stats\">\n\
         <div class=\"stat\">Executions: {}</div>\n<div class=\"stat\">Active Contexts: {}</div>\n\
         <div class=\"stat\">Last Executed: {last}</div>\n</div>\n</div>\n",
        stats.total_executions, stats.active_executions,
    );

    let _ = write!(
        html,
        "<div class=\"section\">\n<div class=\"section-title\">Triggers ({}):</div>\n",
        wf.triggers.len(),
    );
    for trigger in &wf.triggers {
        let _ = write!(
            html,
            "<div class=\"trigger\"><strong>{}:</strong> {}",
            trigger.kind.label(),
            html_escape(&trigger.name),
        );
        if !trigger.table.is_empty() {
            let _ = write!(html, " (Table: {})", html_escape(&trigger.table));
        }
        if let Some(when) = trigger.when_clause.as_deref().filter(|w| !w.is_empty()) {
            let _ = write!(html, " - When: {}", html_escape(when));
        }
        html.push_str("</div>\n");
    }
    if wf.triggers.is_empty() {
        html.push_str("<p>No triggers found</p>\n");
    }
    html.push_str("</div>\n");

    let _ = write!(
        html,
        "<div class=\"section\">\n<div class=\"section-title\">Activities ({}):</div>\n",
        wf.activities.len(),
    );
    for (i, activity) in wf.activities.iter().enumerate() {
        let _ = write!(
            html,
            "<div class=\"activity\">{}. <strong>{}</strong> ({})",
            i + 1,
            html_escape(&activity.name),
            html_escape(&activity.type_name),
        );
        if !activity.description.is_empty() {
            let _ = write!(html, "<br>Description: {}", html_escape(&activity.description));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");

    let _ = write!(
        html,
        "<div class=\"section\">\n<div class=\"section-title\">References ({}):</div>\n",
        wf.references.len(),
    );
    for reference in &wf.references {
        let _ = write!(
            html,
            "<div class=\"trigger\"><strong>{}:</strong> {}</div>\n",
            reference.kind.label(),
            html_escape(&reference.name),
        );
    }
    if wf.references.is_empty() {
        html.push_str("<p>No external references found</p>\n");
    }
    html.push_str("</div>\n");

    let deps = catalog.dependencies.dependencies(&wf.id);
    if !deps.calls_workflows.is_empty() || !deps.called_by_workflows.is_empty() {
        let _ = write!(
            html,
            "<div class=\"section\">\n<div class=\"section-title\">Dependencies:</div>\n\
             <p><strong>Calls:</strong> {}</p>\n<p><strong>Called by:</strong> {}</p>\n</div>\n",
            link_list(catalog, &deps.calls_workflows),
            link_list(catalog, &deps.called_by_workflows),
        );
    }

    let _ = write!(
        html,
        "<div class=\"section\">\n<div class=\"section-title\">Metadata:</div>\n\
         <p><strong>Created:</strong> {} by {}</p>\n<p><strong>Updated:</strong> {} by {}</p>\n\
         <p><strong>Sys ID:</strong> {}</p>\n</div>\n</div>\n",
        format_timestamp(wf.created_at),
        html_escape(&wf.created_by),
        format_timestamp(wf.updated_at),
        html_escape(&wf.updated_by),
        html_escape(&wf.id),
    );
}

/// Workflow names linked to their sections; ids outside the catalog are
/// shown as plain ids.
fn link_list(catalog: &Catalog, ids: &[String]) -> String {
    if ids.is_empty() {
        return "None".to_string();
    }
    ids.iter()
        .map(|id| match catalog.entry(id) {
            Some(entry) => format!(
                "<a href=\"#{}\">{}</a>",
                html_escape(id),
                html_escape(&entry.record.name)
            ),
            None => html_escape(id),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn escapes_markup() {
        assert_eq!(html_escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn sections_carry_status_class() {
        let html = render(&fixtures::catalog());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<div class=\"workflow active\" id=\"wf1\">"));
        assert!(html.contains("<div class=\"workflow unused\" id=\"wf2\">"));
        assert!(html.contains("<p>Total Workflows: 2</p>"));
    }

    #[test]
    fn content_is_escaped_and_placeholders_used() {
        let html = render(&fixtures::catalog());
        assert!(html.contains("Starts &lt;child&gt;"));
        assert!(html.contains("No triggers found"));
        assert!(html.contains("No description provided"));
        assert!(html.contains("Last Executed: Never"));
    }

    #[test]
    fn dependencies_link_to_catalog_sections() {
        let html = render(&fixtures::catalog());
        assert!(html.contains("<strong>Calls:</strong> <a href=\"#wf2\">Legacy</a>"));
        assert!(html.contains("<strong>Called by:</strong> <a href=\"#wf1\">Hire, onboard</a>"));
    }
}
