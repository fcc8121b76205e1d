//! Diesel row models for workflow persistence.

use super::schema::workflows;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for workflow records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workflows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowRow {
    /// Workflow identifier.
    pub id: uuid::Uuid,
    /// Target project identifier.
    pub project_id: String,
    /// Operator prompt.
    pub prompt: String,
    /// Current stage.
    pub stage: String,
    /// Generated code payload.
    pub generated_code: Option<Value>,
    /// Plan payload.
    pub plan: Option<Value>,
    /// Apply output.
    pub apply_output: Option<String>,
    /// Failure payload.
    pub failure: Option<Value>,
    /// Sync warning payload.
    pub sync_warning: Option<Value>,
    /// Stage history payload.
    pub history: Value,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for workflow records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = workflows)]
#[diesel(treat_none_as_null = true)]
pub struct WorkflowRecord {
    /// Workflow identifier.
    pub id: uuid::Uuid,
    /// Target project identifier.
    pub project_id: String,
    /// Operator prompt.
    pub prompt: String,
    /// Current stage.
    pub stage: String,
    /// Generated code payload.
    pub generated_code: Option<Value>,
    /// Plan payload.
    pub plan: Option<Value>,
    /// Apply output.
    pub apply_output: Option<String>,
    /// Failure payload.
    pub failure: Option<Value>,
    /// Sync warning payload.
    pub sync_warning: Option<Value>,
    /// Stage history payload.
    pub history: Value,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}
