//! Rule-based health classification of catalog records.
//!
//! Every rule is evaluated independently, so a record can carry several
//! tags. Classification is a pure function of the record, the auxiliary
//! [`HealthSignals`] gathered by the caller, and a [`ClassifierConfig`].
//! Two rules have more than one defensible reading; both readings are
//! selectable through the config.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::CatalogError;
use crate::workflow::WorkflowRecord;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of activities for a simple approval workflow.
pub const SIMPLE_APPROVAL_MAX_ACTIVITIES: usize = 3;

/// Default age after which an executing context counts as stuck.
pub const DEFAULT_STUCK_AFTER_HOURS: i64 = 24;

/// Activity type fragments that mark a notification step.
pub const NOTIFICATION_TYPE_MARKERS: &[&str] = &["Notification", "Email"];

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MigrationKind {
    Simple,
    NotificationOnly,
    SingleActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthTag {
    EmptyWorkflow,
    StuckExecution,
    PotentiallyUnused,
    MigrationCandidate(MigrationKind),
    Active,
}

impl HealthTag {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EmptyWorkflow => "empty_workflow",
            Self::StuckExecution => "stuck_execution",
            Self::PotentiallyUnused => "potentially_unused",
            Self::MigrationCandidate(MigrationKind::Simple) => "migration_candidate:simple",
            Self::MigrationCandidate(MigrationKind::NotificationOnly) => {
                "migration_candidate:notification_only"
            }
            Self::MigrationCandidate(MigrationKind::SingleActivity) => {
                "migration_candidate:single_activity"
            }
            Self::Active => "active",
        }
    }
}

impl fmt::Display for HealthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for HealthTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reading of the simple-approval migration rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimpleApprovalRule {
    /// `len <= 3 AND (user approval OR group approval)`.
    #[default]
    Grouped,
    /// `(len <= 3 AND user approval) OR group approval`, as the rule was
    /// historically written.
    Literal,
}

impl SimpleApprovalRule {
    pub fn from_str_value(s: &str) -> Result<Self, CatalogError> {
        match s {
            "grouped" => Ok(Self::Grouped),
            "literal" => Ok(Self::Literal),
            _ => Err(CatalogError::Validation(format!(
                "Invalid simple approval rule '{s}'. Must be one of: grouped, literal"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub simple_approval: SimpleApprovalRule,
    /// Whether a workflow without activities counts as notification-only.
    pub empty_is_notification_only: bool,
    /// Age after which an executing context is stuck.
    pub stuck_after: chrono::Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            simple_approval: SimpleApprovalRule::Grouped,
            empty_is_notification_only: false,
            stuck_after: chrono::Duration::hours(DEFAULT_STUCK_AFTER_HOURS),
        }
    }
}

/// Facts about a workflow that are not part of its record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthSignals {
    /// Executing contexts older than the stuck threshold.
    pub stuck_executions: u64,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

pub fn classify(
    record: &WorkflowRecord,
    signals: &HealthSignals,
    config: &ClassifierConfig,
) -> BTreeSet<HealthTag> {
    let mut tags = BTreeSet::new();

    let empty = record.activities.is_empty();
    if empty {
        tags.insert(HealthTag::EmptyWorkflow);
    }

    if signals.stuck_executions > 0 {
        tags.insert(HealthTag::StuckExecution);
    }

    let unused = is_potentially_unused(record);
    if unused {
        tags.insert(HealthTag::PotentiallyUnused);
    }

    if is_simple_approval(record, config.simple_approval) {
        tags.insert(HealthTag::MigrationCandidate(MigrationKind::Simple));
    }

    if is_notification_only(record, config.empty_is_notification_only) {
        tags.insert(HealthTag::MigrationCandidate(MigrationKind::NotificationOnly));
    }

    if record.activities.len() == 1 {
        tags.insert(HealthTag::MigrationCandidate(MigrationKind::SingleActivity));
    }

    if record.active && !empty && !unused {
        tags.insert(HealthTag::Active);
    }

    tags
}

/// No triggers, no references, and never executed.
pub fn is_potentially_unused(record: &WorkflowRecord) -> bool {
    record.triggers.is_empty()
        && record.references.is_empty()
        && record.statistics.never_executed()
}

pub fn is_simple_approval(record: &WorkflowRecord, rule: SimpleApprovalRule) -> bool {
    let small = record.activities.len() <= SIMPLE_APPROVAL_MAX_ACTIVITIES;
    let user = record.has_user_approval();
    let group = record.has_group_approval();
    match rule {
        SimpleApprovalRule::Grouped => small && (user || group),
        SimpleApprovalRule::Literal => (small && user) || group,
    }
}

pub fn is_notification_only(record: &WorkflowRecord, empty_qualifies: bool) -> bool {
    if record.activities.is_empty() {
        return empty_qualifies;
    }
    record
        .activity_types()
        .all(|t| NOTIFICATION_TYPE_MARKERS.iter().any(|m| t.contains(m)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
