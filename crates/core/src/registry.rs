//! Registries of scannable collections.
//!
//! Each row describes one collection: which text field to search and which
//! optional display fields it actually has. Adding a source means appending
//! a row; the scanners iterate the registry and never branch on collection
//! names.

use crate::collections::*;
use crate::workflow::{ReferenceKind, TriggerKind};

// ---------------------------------------------------------------------------
// Reference sources
// ---------------------------------------------------------------------------

/// A collection whose text body may mention a workflow by id or name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSource {
    pub collection: &'static str,
    /// Field searched with a text-contains match.
    pub text_field: &'static str,
    pub kind: ReferenceKind,
    /// Display name field, when the collection has one.
    pub name_field: Option<&'static str>,
    /// Target table field, when the collection has one.
    pub table_field: Option<&'static str>,
}

/// Ordered set of reference sources. Scan results follow registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRegistry {
    sources: Vec<ReferenceSource>,
}

impl ReferenceRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source at the end of the scan order.
    pub fn with_source(mut self, source: ReferenceSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[ReferenceSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for ReferenceRegistry {
    fn default() -> Self {
        Self::empty()
            .with_source(ReferenceSource {
                collection: SCRIPT_INCLUDE,
                text_field: FIELD_SCRIPT,
                kind: ReferenceKind::ScriptInclude,
                name_field: Some(FIELD_NAME),
                table_field: None,
            })
            .with_source(ReferenceSource {
                collection: CLIENT_SCRIPT,
                text_field: FIELD_SCRIPT,
                kind: ReferenceKind::ClientScript,
                name_field: Some(FIELD_NAME),
                table_field: Some(FIELD_TABLE),
            })
            .with_source(ReferenceSource {
                collection: EMAIL_ACTION,
                text_field: FIELD_MESSAGE_HTML,
                kind: ReferenceKind::EmailNotification,
                name_field: Some(FIELD_NAME),
                table_field: Some(FIELD_COLLECTION),
            })
            .with_source(ReferenceSource {
                collection: WS_OPERATION,
                text_field: FIELD_OPERATION_SCRIPT,
                kind: ReferenceKind::RestApi,
                name_field: Some(FIELD_NAME),
                table_field: None,
            })
            .with_source(ReferenceSource {
                collection: SCHEDULED_SCRIPT,
                text_field: FIELD_SCRIPT,
                kind: ReferenceKind::ScheduledJob,
                name_field: Some(FIELD_NAME),
                table_field: None,
            })
            .with_source(ReferenceSource {
                collection: TRANSFORM_SCRIPT,
                text_field: FIELD_SCRIPT,
                kind: ReferenceKind::TransformScript,
                name_field: None,
                table_field: None,
            })
    }
}

// ---------------------------------------------------------------------------
// Trigger sources
// ---------------------------------------------------------------------------

/// A collection whose scripts can start a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSource {
    pub collection: &'static str,
    /// Script field searched for the workflow id.
    pub script_field: &'static str,
    pub kind: TriggerKind,
    pub name_field: &'static str,
    pub table_field: &'static str,
    pub condition_field: &'static str,
    pub when_field: Option<&'static str>,
}

/// Ordered set of trigger sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRegistry {
    sources: Vec<TriggerSource>,
}

impl TriggerRegistry {
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: TriggerSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[TriggerSource] {
        &self.sources
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::empty()
            .with_source(TriggerSource {
                collection: BUSINESS_RULE,
                script_field: FIELD_SCRIPT,
                kind: TriggerKind::BusinessRule,
                name_field: FIELD_NAME,
                table_field: FIELD_TABLE,
                condition_field: FIELD_CONDITION,
                when_field: Some(FIELD_WHEN),
            })
            .with_source(TriggerSource {
                collection: UI_ACTION,
                script_field: FIELD_SCRIPT,
                kind: TriggerKind::UiAction,
                name_field: FIELD_ACTION_NAME,
                table_field: FIELD_TABLE,
                condition_field: FIELD_CONDITION,
                when_field: None,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
