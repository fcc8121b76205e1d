//! Stage-change notifications broadcast to subscribers.

use crate::workflow::domain::{ProjectId, Workflow, WorkflowId, WorkflowStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A workflow entered a new stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Workflow that moved.
    pub workflow_id: WorkflowId,
    /// Project the workflow targets.
    pub project_id: ProjectId,
    /// Stage entered.
    pub stage: WorkflowStage,
    /// When the stage was entered.
    pub occurred_at: DateTime<Utc>,
}

impl WorkflowEvent {
    /// Describes the stage `workflow` currently occupies.
    #[must_use]
    pub fn stage_entered(workflow: &Workflow) -> Self {
        Self {
            workflow_id: workflow.id(),
            project_id: workflow.project_id().clone(),
            stage: workflow.stage(),
            occurred_at: workflow.updated_at(),
        }
    }
}
