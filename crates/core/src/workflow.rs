//! Canonical workflow catalog records.
//!
//! A [`WorkflowRecord`] is the assembled view of one published workflow
//! version: header fields copied from the definition row plus the derived
//! enrichment (triggers, activities, statistics, references). Field names
//! are part of the external contract consumed by report renderers.

use serde::{Deserialize, Serialize};

use crate::collections::{ACTIVITY_TYPE_APPROVAL_GROUP, ACTIVITY_TYPE_APPROVAL_USER};
use crate::types::{SysId, Timestamp};

// ---------------------------------------------------------------------------
// WorkflowRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: SysId,
    pub name: String,
    pub target_table: String,
    pub description: String,
    pub active: bool,
    pub created_at: Option<Timestamp>,
    pub created_by: String,
    pub updated_at: Option<Timestamp>,
    pub updated_by: String,
    pub triggers: Vec<Trigger>,
    /// Sorted by `order`; ties keep the store's natural order.
    pub activities: Vec<Activity>,
    pub statistics: Statistics,
    pub references: Vec<Reference>,
}

impl WorkflowRecord {
    /// A record with header fields only and empty enrichment.
    pub fn new(id: impl Into<SysId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target_table: String::new(),
            description: String::new(),
            active: true,
            created_at: None,
            created_by: String::new(),
            updated_at: None,
            updated_by: String::new(),
            triggers: Vec::new(),
            activities: Vec::new(),
            statistics: Statistics::default(),
            references: Vec::new(),
        }
    }

    /// Activity type names in execution order.
    pub fn activity_types(&self) -> impl Iterator<Item = &str> {
        self.activities.iter().map(|a| a.type_name.as_str())
    }

    pub fn has_activity_type(&self, type_name: &str) -> bool {
        self.activity_types().any(|t| t == type_name)
    }

    pub fn has_user_approval(&self) -> bool {
        self.has_activity_type(ACTIVITY_TYPE_APPROVAL_USER)
    }

    pub fn has_group_approval(&self) -> bool {
        self.has_activity_type(ACTIVITY_TYPE_APPROVAL_GROUP)
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Mechanism capable of starting a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    #[serde(rename = "Business Rule")]
    BusinessRule,
    #[serde(rename = "UI Action")]
    UiAction,
}

impl TriggerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BusinessRule => "Business Rule",
            Self::UiAction => "UI Action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub name: String,
    pub table: String,
    pub condition: String,
    /// Only business rules carry a `when` clause.
    pub when_clause: Option<String>,
    pub source_id: SysId,
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub type_name: String,
    /// Display sequencing only; values may have gaps.
    pub order: i64,
    pub condition: String,
    pub description: String,
    pub source_id: SysId,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Execution snapshot for one workflow, recomputed on every build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_executions: u64,
    pub active_executions: u64,
    pub last_executed_at: Option<Timestamp>,
}

impl Statistics {
    /// Assemble a snapshot from independently counted values.
    ///
    /// The active and total counts come from separate queries; a run that
    /// starts between them could otherwise make `active > total`.
    pub fn new(total: u64, active: u64, last_executed_at: Option<Timestamp>) -> Self {
        Self {
            total_executions: total,
            active_executions: active.min(total),
            last_executed_at,
        }
    }

    pub fn never_executed(&self) -> bool {
        self.total_executions == 0
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// Kind of record that mentions a workflow, one per scannable source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    #[serde(rename = "Script Include")]
    ScriptInclude,
    #[serde(rename = "Client Script")]
    ClientScript,
    #[serde(rename = "Email Notification")]
    EmailNotification,
    #[serde(rename = "REST API")]
    RestApi,
    #[serde(rename = "Scheduled Job")]
    ScheduledJob,
    #[serde(rename = "Transform Script")]
    TransformScript,
}

impl ReferenceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ScriptInclude => "Script Include",
            Self::ClientScript => "Client Script",
            Self::EmailNotification => "Email Notification",
            Self::RestApi => "REST API",
            Self::ScheduledJob => "Scheduled Job",
            Self::TransformScript => "Transform Script",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Falls back to `source_id` when the source record has no name.
    pub name: String,
    pub table: Option<String>,
    pub source_id: SysId,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
