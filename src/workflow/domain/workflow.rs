//! Workflow aggregate root tracking one change request through the pipeline.

use super::{
    ApplyOutcome, ChangeRequest, FailureKind, GeneratedCode, PlanSummary, ProjectId, PromptText,
    StageEntry, SyncWarning, WorkflowDomainError, WorkflowFailure, WorkflowId, WorkflowStage,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Workflow aggregate root.
///
/// Every mutation goes through the stage transition table; the stage history
/// only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    request: ChangeRequest,
    stage: WorkflowStage,
    generated_code: Option<GeneratedCode>,
    plan: Option<PlanSummary>,
    apply_outcome: Option<ApplyOutcome>,
    failure: Option<WorkflowFailure>,
    sync_warning: Option<SyncWarning>,
    history: Vec<StageEntry>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedWorkflowData {
    /// Persisted change request.
    pub request: ChangeRequest,
    /// Persisted current stage.
    pub stage: WorkflowStage,
    /// Persisted generated code, if generation succeeded.
    pub generated_code: Option<GeneratedCode>,
    /// Persisted plan, if planning succeeded.
    pub plan: Option<PlanSummary>,
    /// Persisted apply output, if apply succeeded.
    pub apply_outcome: Option<ApplyOutcome>,
    /// Persisted failure record, if an adapter failed.
    pub failure: Option<WorkflowFailure>,
    /// Persisted sync warning, if sync degraded.
    pub sync_warning: Option<SyncWarning>,
    /// Persisted stage history.
    pub history: Vec<StageEntry>,
    /// Persisted latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates a workflow in [`WorkflowStage::Submitted`] for a change
    /// request.
    #[must_use]
    pub fn submit(request: ChangeRequest, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            request,
            stage: WorkflowStage::Submitted,
            generated_code: None,
            plan: None,
            apply_outcome: None,
            failure: None,
            sync_warning: None,
            history: vec![StageEntry {
                stage: WorkflowStage::Submitted,
                entered_at: timestamp,
            }],
            updated_at: timestamp,
        }
    }

    /// Reconstructs a workflow from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedWorkflowData) -> Self {
        Self {
            request: data.request,
            stage: data.stage,
            generated_code: data.generated_code,
            plan: data.plan,
            apply_outcome: data.apply_outcome,
            failure: data.failure,
            sync_warning: data.sync_warning,
            history: data.history,
            updated_at: data.updated_at,
        }
    }

    /// Returns the workflow identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowId {
        self.request.id()
    }

    /// Returns the originating change request.
    #[must_use]
    pub const fn request(&self) -> &ChangeRequest {
        &self.request
    }

    /// Returns the target project.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        self.request.project_id()
    }

    /// Returns the prompt text.
    #[must_use]
    pub const fn prompt(&self) -> &PromptText {
        self.request.prompt()
    }

    /// Returns the current stage.
    #[must_use]
    pub const fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Returns the generated code, once generation succeeded.
    #[must_use]
    pub const fn generated_code(&self) -> Option<&GeneratedCode> {
        self.generated_code.as_ref()
    }

    /// Returns the computed plan, once planning succeeded.
    #[must_use]
    pub const fn plan(&self) -> Option<&PlanSummary> {
        self.plan.as_ref()
    }

    /// Returns the apply output, once apply succeeded.
    #[must_use]
    pub const fn apply_outcome(&self) -> Option<&ApplyOutcome> {
        self.apply_outcome.as_ref()
    }

    /// Returns the failure that ended the workflow, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&WorkflowFailure> {
        self.failure.as_ref()
    }

    /// Returns the sync warning of a completed workflow, if any.
    #[must_use]
    pub const fn sync_warning(&self) -> Option<&SyncWarning> {
        self.sync_warning.as_ref()
    }

    /// Returns the append-only stage history.
    #[must_use]
    pub fn history(&self) -> &[StageEntry] {
        &self.history
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.request.created_at()
    }

    /// Returns the latest transition timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Starts code generation.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is [`WorkflowStage::Submitted`].
    pub fn begin_generation(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.transition_to(WorkflowStage::GeneratingCode, clock)
    }

    /// Stores generated code and moves on to planning.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is [`WorkflowStage::GeneratingCode`].
    pub fn record_generated_code(
        &mut self,
        code: GeneratedCode,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.transition_to(WorkflowStage::PlanPending, clock)?;
        self.generated_code = Some(code);
        Ok(())
    }

    /// Stores the computed plan and suspends for operator approval.
    ///
    /// Zero-change plans are stored too; they can only be rejected.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is [`WorkflowStage::PlanPending`].
    pub fn record_plan(
        &mut self,
        plan: PlanSummary,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.transition_to(WorkflowStage::AwaitingApproval, clock)?;
        self.plan = Some(plan);
        Ok(())
    }

    /// Approves the stored plan and moves to [`WorkflowStage::Applying`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is awaiting approval, and
    /// [`WorkflowDomainError::NothingToApprove`] when the plan has no changes.
    pub fn approve(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.ensure_transition(WorkflowStage::Applying)?;
        if !self.plan.as_ref().is_some_and(PlanSummary::has_changes) {
            return Err(WorkflowDomainError::NothingToApprove(self.id()));
        }
        self.transition_to(WorkflowStage::Applying, clock)
    }

    /// Rejects the stored plan. Rejection is a normal outcome, not a failure.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is awaiting approval.
    pub fn reject(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.transition_to(WorkflowStage::Rejected, clock)
    }

    /// Stores apply output and moves to version-control sync when
    /// `sync_required`, otherwise straight to [`WorkflowStage::Completed`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is [`WorkflowStage::Applying`].
    pub fn record_apply_outcome(
        &mut self,
        outcome: ApplyOutcome,
        sync_required: bool,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        let target = if sync_required {
            WorkflowStage::SyncingVcs
        } else {
            WorkflowStage::Completed
        };
        self.transition_to(target, clock)?;
        self.apply_outcome = Some(outcome);
        Ok(())
    }

    /// Completes the workflow after sync, attaching a warning when sync
    /// degraded. The infrastructure change is live either way.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] unless the
    /// workflow is [`WorkflowStage::SyncingVcs`].
    pub fn record_sync(
        &mut self,
        warning: Option<SyncWarning>,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.transition_to(WorkflowStage::Completed, clock)?;
        self.sync_warning = warning;
        Ok(())
    }

    /// Ends the workflow with an adapter failure.
    ///
    /// The failure kind must belong to the current stage; sync failures are
    /// never terminal and go through [`Workflow::record_sync`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] from a terminal
    /// stage and [`WorkflowDomainError::MismatchedFailure`] when the kind does
    /// not match the stage.
    pub fn fail(
        &mut self,
        failure: WorkflowFailure,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.ensure_transition(WorkflowStage::Failed)?;
        let kind = failure.kind();
        if kind == FailureKind::SyncFailed || FailureKind::for_stage(self.stage) != Some(kind) {
            return Err(WorkflowDomainError::MismatchedFailure {
                workflow_id: self.id(),
                stage: self.stage,
                kind,
            });
        }
        self.transition_to(WorkflowStage::Failed, clock)?;
        self.failure = Some(failure);
        Ok(())
    }

    /// Cancels the workflow before any infrastructure change.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidStageTransition`] once a plan is
    /// awaiting approval or later.
    pub fn cancel(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.transition_to(WorkflowStage::Cancelled, clock)
    }

    fn ensure_transition(&self, target: WorkflowStage) -> Result<(), WorkflowDomainError> {
        if self.stage.can_transition_to(target) {
            return Ok(());
        }
        Err(WorkflowDomainError::InvalidStageTransition {
            workflow_id: self.id(),
            from: self.stage,
            to: target,
        })
    }

    fn transition_to(
        &mut self,
        target: WorkflowStage,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.ensure_transition(target)?;
        let timestamp = clock.utc();
        self.stage = target;
        self.history.push(StageEntry {
            stage: target,
            entered_at: timestamp,
        });
        self.updated_at = timestamp;
        Ok(())
    }
}
