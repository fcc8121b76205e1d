//! Error taxonomy for workflow domain validation and lifecycle guards.

use super::{WorkflowId, WorkflowStage};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed taxonomy of errors observable by callers of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller supplied invalid input; nothing changed.
    InvalidInput,
    /// The workflow identifier is unknown.
    NotFound,
    /// Another active workflow holds the project lock.
    ProjectBusy,
    /// The operation is not valid in the workflow's current stage.
    InvalidTransition,
    /// Code generation failed.
    GenerationFailed,
    /// Plan computation failed.
    PlanFailed,
    /// Apply failed.
    ApplyFailed,
    /// Version-control sync failed after a successful apply.
    SyncFailed,
}

impl ErrorKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::ProjectBusy => "project_busy",
            Self::InvalidTransition => "invalid_transition",
            Self::GenerationFailed => "generation_failed",
            Self::PlanFailed => "plan_failed",
            Self::ApplyFailed => "apply_failed",
            Self::SyncFailed => "sync_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter failure kinds recorded on a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The code generator failed or returned no code.
    GenerationFailed,
    /// The executor could not compute a plan.
    PlanFailed,
    /// The executor failed to apply the plan.
    ApplyFailed,
    /// Version-control sync failed; never terminal.
    SyncFailed,
}

impl FailureKind {
    /// Returns the failure kind attributable to an adapter call made while the
    /// workflow sits in `stage`.
    ///
    /// Returns `None` for stages that make no adapter call.
    #[must_use]
    pub const fn for_stage(stage: WorkflowStage) -> Option<Self> {
        match stage {
            WorkflowStage::Submitted | WorkflowStage::GeneratingCode => {
                Some(Self::GenerationFailed)
            }
            WorkflowStage::PlanPending | WorkflowStage::AwaitingApproval => Some(Self::PlanFailed),
            WorkflowStage::Applying => Some(Self::ApplyFailed),
            WorkflowStage::SyncingVcs => Some(Self::SyncFailed),
            WorkflowStage::Completed
            | WorkflowStage::Failed
            | WorkflowStage::Rejected
            | WorkflowStage::Cancelled => None,
        }
    }
}

impl From<FailureKind> for ErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::GenerationFailed => Self::GenerationFailed,
            FailureKind::PlanFailed => Self::PlanFailed,
            FailureKind::ApplyFailed => Self::ApplyFailed,
            FailureKind::SyncFailed => Self::SyncFailed,
        }
    }
}

/// Errors returned while constructing workflow values or applying
/// lifecycle operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// The prompt text is empty after trimming.
    #[error("prompt text must not be empty")]
    EmptyPrompt,

    /// The project identifier is empty after trimming.
    #[error("project identifier must not be empty")]
    EmptyProjectId,

    /// The project identifier contains whitespace or is too long.
    #[error("invalid project identifier '{0}'")]
    InvalidProjectId(String),

    /// The plan identifier is empty after trimming.
    #[error("plan identifier must not be empty")]
    EmptyPlanId,

    /// The transition is absent from the stage transition table.
    #[error("workflow {workflow_id} cannot move from {from} to {to}")]
    InvalidStageTransition {
        /// Workflow identifier.
        workflow_id: WorkflowId,
        /// Current stage.
        from: WorkflowStage,
        /// Requested target stage.
        to: WorkflowStage,
    },

    /// Approval was requested for a plan that changes nothing.
    #[error("workflow {0} has a plan with no changes; nothing to approve")]
    NothingToApprove(WorkflowId),

    /// The failure kind does not belong to the stage being failed.
    #[error("workflow {workflow_id} in stage {stage} cannot record {kind:?}")]
    MismatchedFailure {
        /// Workflow identifier.
        workflow_id: WorkflowId,
        /// Current stage.
        stage: WorkflowStage,
        /// Offered failure kind.
        kind: FailureKind,
    },
}

impl WorkflowDomainError {
    /// Maps the domain error onto the caller-visible taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyPrompt
            | Self::EmptyProjectId
            | Self::InvalidProjectId(_)
            | Self::EmptyPlanId => ErrorKind::InvalidInput,
            Self::InvalidStageTransition { .. }
            | Self::NothingToApprove(_)
            | Self::MismatchedFailure { .. } => ErrorKind::InvalidTransition,
        }
    }
}

/// Error returned while parsing workflow stages from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workflow stage: {0}")]
pub struct ParseWorkflowStageError(pub String);
