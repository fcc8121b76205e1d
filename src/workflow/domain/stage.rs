//! Workflow stages and the explicit stage transition table.

use super::ParseWorkflowStageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete lifecycle stage of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Change request accepted; generation has not started.
    Submitted,
    /// Code generation is in flight.
    GeneratingCode,
    /// Generated code is stored; plan computation is in flight.
    PlanPending,
    /// A plan is stored; waiting for an operator decision.
    AwaitingApproval,
    /// The approved plan is being applied.
    Applying,
    /// Apply succeeded; the code is being pushed to version control.
    SyncingVcs,
    /// Apply succeeded (sync may have degraded).
    Completed,
    /// An adapter failed; the error is recorded on the workflow.
    Failed,
    /// The operator rejected the plan.
    Rejected,
    /// The operator cancelled before any infrastructure change.
    Cancelled,
}

impl WorkflowStage {
    /// Every stage, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Submitted,
        Self::GeneratingCode,
        Self::PlanPending,
        Self::AwaitingApproval,
        Self::Applying,
        Self::SyncingVcs,
        Self::Completed,
        Self::Failed,
        Self::Rejected,
        Self::Cancelled,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::GeneratingCode => "generating_code",
            Self::PlanPending => "plan_pending",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Applying => "applying",
            Self::SyncingVcs => "syncing_vcs",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns the position of the stage in the lifecycle partial order.
    ///
    /// Terminal stages share the maximal rank.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::GeneratingCode => 1,
            Self::PlanPending => 2,
            Self::AwaitingApproval => 3,
            Self::Applying => 4,
            Self::SyncingVcs => 5,
            Self::Completed | Self::Failed | Self::Rejected | Self::Cancelled => 6,
        }
    }

    /// Returns whether no further transition can occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Rejected | Self::Cancelled
        )
    }

    /// Returns whether the workflow is waiting on nothing but the operator
    /// (or on nothing at all).
    #[must_use]
    pub const fn is_settled(self) -> bool {
        self.is_terminal() || matches!(self, Self::AwaitingApproval)
    }

    /// Returns whether the operator may still cancel.
    ///
    /// Cancellation stops once a plan is ready; from there the operator
    /// rejects instead.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::GeneratingCode | Self::PlanPending
        )
    }

    /// Returns whether transition to `target` is present in the transition
    /// table.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Submitted, Self::GeneratingCode)
            | (Self::GeneratingCode, Self::PlanPending)
            | (Self::PlanPending, Self::AwaitingApproval)
            | (Self::AwaitingApproval, Self::Applying | Self::Rejected)
            | (Self::Applying, Self::SyncingVcs | Self::Completed)
            | (Self::SyncingVcs, Self::Completed) => true,
            (Self::Submitted | Self::GeneratingCode | Self::PlanPending, Self::Cancelled) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkflowStage {
    type Error = ParseWorkflowStageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| ParseWorkflowStageError(value.to_owned()))
    }
}
