//! Collection and field names of the workflow engine's record store.
//!
//! Every query the catalog issues is built from these constants; there are
//! no collection names inlined elsewhere.

// ---------------------------------------------------------------------------
// Common fields
// ---------------------------------------------------------------------------

/// Primary identifier column present on every record.
pub const FIELD_SYS_ID: &str = "sys_id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_CONDITION: &str = "condition";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_SCRIPT: &str = "script";
pub const FIELD_CREATED_ON: &str = "sys_created_on";
pub const FIELD_CREATED_BY: &str = "sys_created_by";
pub const FIELD_UPDATED_ON: &str = "sys_updated_on";
pub const FIELD_UPDATED_BY: &str = "sys_updated_by";

// ---------------------------------------------------------------------------
// Workflow definitions
// ---------------------------------------------------------------------------

/// Published workflow versions; the primary scan source.
pub const WORKFLOW_VERSION: &str = "wf_workflow_version";
pub const FIELD_PUBLISHED: &str = "published";
pub const FIELD_ACTIVE: &str = "active";

// ---------------------------------------------------------------------------
// Activities and their parameter values
// ---------------------------------------------------------------------------

pub const ACTIVITY: &str = "wf_activity";
/// Reference from an activity to its owning workflow version.
pub const FIELD_WORKFLOW_VERSION: &str = "workflow_version";
/// Dotted path to the activity type's display name.
pub const FIELD_ACTIVITY_TYPE: &str = "activity_definition.name";
pub const FIELD_ORDER: &str = "order";

pub const VARIABLE_VALUE: &str = "wf_variable_value";
/// Reference from a variable value to its activity.
pub const FIELD_ACTIVITY: &str = "activity";
/// Dotted path to the variable's name.
pub const FIELD_VARIABLE_NAME: &str = "variable.name";
pub const FIELD_VALUE: &str = "value";

/// Activity type that invokes another workflow.
pub const ACTIVITY_TYPE_RUN_WORKFLOW: &str = "Run Workflow";
/// Variable of a "Run Workflow" activity holding the target workflow id.
pub const VARIABLE_WORKFLOW: &str = "workflow";

pub const ACTIVITY_TYPE_APPROVAL_USER: &str = "Approval - User";
pub const ACTIVITY_TYPE_APPROVAL_GROUP: &str = "Approval - Group";

// ---------------------------------------------------------------------------
// Execution contexts
// ---------------------------------------------------------------------------

pub const CONTEXT: &str = "wf_context";
pub const FIELD_STATE: &str = "state";
pub const STATE_EXECUTING: &str = "executing";

// ---------------------------------------------------------------------------
// Trigger sources
// ---------------------------------------------------------------------------

pub const BUSINESS_RULE: &str = "sys_script";
pub const FIELD_WHEN: &str = "when";

pub const UI_ACTION: &str = "sys_ui_action";
pub const FIELD_ACTION_NAME: &str = "action_name";

// ---------------------------------------------------------------------------
// Reference sources
// ---------------------------------------------------------------------------

pub const SCRIPT_INCLUDE: &str = "sys_script_include";
pub const CLIENT_SCRIPT: &str = "sys_script_client";
pub const EMAIL_ACTION: &str = "sysevent_email_action";
pub const FIELD_MESSAGE_HTML: &str = "message_html";
pub const FIELD_COLLECTION: &str = "collection";
pub const WS_OPERATION: &str = "sys_ws_operation";
pub const FIELD_OPERATION_SCRIPT: &str = "operation_script";
pub const SCHEDULED_SCRIPT: &str = "sysauto_script";
pub const TRANSFORM_SCRIPT: &str = "sys_transform_script";
