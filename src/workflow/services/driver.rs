//! Stage runner shared by the supervisor's operations.
//!
//! Each live workflow owns a slot: its snapshot behind an async mutex, the
//! project lease, and the abort handle of the task advancing it. The driver
//! task takes the slot lock only to decide the next adapter call and to
//! record its outcome, never across the call itself, so operator commands
//! are serialized against stage transitions without waiting on adapters.

use super::commit_message::CommitMessageRenderer;
use super::events::WorkflowEvent;
use super::locks::{ProjectLease, ProjectLockTable};
use super::supervisor::PipelinePorts;
use crate::workflow::{
    domain::{
        ApplyOutcome, ErrorKind, FailureKind, GeneratedCode, PlanId, PlanSummary, ProjectConfig,
        PromptText, SyncWarning, Workflow, WorkflowDomainError, WorkflowFailure, WorkflowId,
        WorkflowStage,
    },
    ports::{
        AdapterError, AdapterResult, CodeGenerator, InfrastructureExecutor, ProjectCatalog,
        VersionControlSync, WorkflowRepository,
    },
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, MutexGuard, broadcast, watch};
use tokio::task::AbortHandle;
use tracing::Instrument;

/// Mutable state of one live workflow.
pub(super) struct SlotState {
    pub(super) workflow: Workflow,
    project: Arc<ProjectConfig>,
    lease: Option<ProjectLease>,
    driver: Option<AbortHandle>,
}

impl SlotState {
    /// Stops the driver task. Results it had in flight are discarded.
    pub(super) fn abort_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// A live workflow and the channel publishing its snapshots.
pub(super) struct WorkflowSlot {
    state: Mutex<SlotState>,
    snapshot: watch::Sender<Workflow>,
}

impl WorkflowSlot {
    pub(super) async fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().await
    }

    pub(super) fn snapshot(&self) -> Workflow {
        self.snapshot.borrow().clone()
    }

    pub(super) fn watch(&self) -> watch::Receiver<Workflow> {
        self.snapshot.subscribe()
    }
}

enum PendingCall {
    Generate {
        prompt: PromptText,
        project: Arc<ProjectConfig>,
    },
    Plan {
        code: String,
        project: Arc<ProjectConfig>,
    },
    Apply {
        plan_id: PlanId,
        project: Arc<ProjectConfig>,
    },
    Sync {
        code: String,
        message: Result<String, String>,
        project: Arc<ProjectConfig>,
    },
}

impl PendingCall {
    const fn stage(&self) -> WorkflowStage {
        match self {
            Self::Generate { .. } => WorkflowStage::GeneratingCode,
            Self::Plan { .. } => WorkflowStage::PlanPending,
            Self::Apply { .. } => WorkflowStage::Applying,
            Self::Sync { .. } => WorkflowStage::SyncingVcs,
        }
    }
}

enum CallOutcome {
    Generated(AdapterResult<GeneratedCode>),
    Planned(AdapterResult<PlanSummary>),
    Applied(AdapterResult<ApplyOutcome>),
    Synced(Result<(), String>),
}

/// State shared by the supervisor handle and its driver tasks.
pub(super) struct SupervisorCore<G, X, V, P, R, C> {
    pub(super) ports: PipelinePorts<G, X, V, P, R>,
    pub(super) clock: Arc<C>,
    pub(super) locks: ProjectLockTable,
    pub(super) events: broadcast::Sender<WorkflowEvent>,
    commit_messages: CommitMessageRenderer,
    live: RwLock<HashMap<WorkflowId, Arc<WorkflowSlot>>>,
}

impl<G, X, V, P, R, C> SupervisorCore<G, X, V, P, R, C>
where
    G: CodeGenerator + 'static,
    X: InfrastructureExecutor + 'static,
    V: VersionControlSync + 'static,
    P: ProjectCatalog + 'static,
    R: WorkflowRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    pub(super) fn new(
        ports: PipelinePorts<G, X, V, P, R>,
        clock: Arc<C>,
        commit_messages: CommitMessageRenderer,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            ports,
            clock,
            locks: ProjectLockTable::new(),
            events,
            commit_messages,
            live: RwLock::new(HashMap::new()),
        }
    }

    pub(super) fn slot(&self, id: WorkflowId) -> Option<Arc<WorkflowSlot>> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Registers a workflow as live until it reaches a terminal stage.
    pub(super) fn register(
        &self,
        workflow: Workflow,
        project: Arc<ProjectConfig>,
        lease: ProjectLease,
    ) -> Arc<WorkflowSlot> {
        let id = workflow.id();
        let (snapshot, _) = watch::channel(workflow.clone());
        let slot = Arc::new(WorkflowSlot {
            state: Mutex::new(SlotState {
                workflow,
                project,
                lease: Some(lease),
                driver: None,
            }),
            snapshot,
        });
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&slot));
        slot
    }

    /// Starts a task that advances the workflow until it settles.
    ///
    /// A panic inside an adapter call fails the workflow at its current
    /// stage so the project lease is still released. Does nothing while
    /// another driver owns the slot.
    pub(super) fn spawn_driver(self: &Arc<Self>, slot: &Arc<WorkflowSlot>, state: &mut SlotState) {
        if state.driver.is_some() {
            tracing::debug!(
                workflow_id = %state.workflow.id(),
                "driver already running; not spawning another"
            );
            return;
        }
        let span = tracing::info_span!(
            "workflow",
            workflow_id = %state.workflow.id(),
            project_id = %state.workflow.project_id()
        );
        let driver = tokio::spawn(
            Arc::clone(self)
                .drive(Arc::clone(slot))
                .instrument(span.clone()),
        );
        state.driver = Some(driver.abort_handle());

        let core = Arc::clone(self);
        let watched = Arc::clone(slot);
        tokio::spawn(
            async move {
                if driver.await.is_err_and(|err| err.is_panic()) {
                    let mut guard = watched.lock().await;
                    core.abandon(&watched, &mut guard, "adapter call panicked")
                        .await;
                }
            }
            .instrument(span),
        );
    }

    /// Persists, releases the lease on terminal stages, and publishes the
    /// current snapshot. Terminal workflows leave the live map afterwards and
    /// are served from the repository. Callers hold the slot lock.
    pub(super) async fn commit(&self, slot: &WorkflowSlot, state: &mut SlotState) {
        let workflow = &state.workflow;
        tracing::info!(
            workflow_id = %workflow.id(),
            project_id = %workflow.project_id(),
            stage = %workflow.stage(),
            "workflow stage changed"
        );
        if let Err(err) = self.ports.repository.update(workflow).await {
            tracing::error!(
                workflow_id = %workflow.id(),
                error = %err,
                "failed to persist workflow snapshot"
            );
        }
        let finished = workflow.stage().is_terminal();
        if finished {
            state.driver = None;
            state.lease = None;
        }

        if self
            .events
            .send(WorkflowEvent::stage_entered(&state.workflow))
            .is_err()
        {
            tracing::trace!("no workflow event subscribers");
        }
        slot.snapshot.send_replace(state.workflow.clone());
        if finished {
            self.evict(state.workflow.id());
        }
    }

    fn evict(&self, id: WorkflowId) {
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Ends the workflow at its current stage with `reason` and commits the
    /// result.
    pub(super) async fn abandon(&self, slot: &WorkflowSlot, state: &mut SlotState, reason: &str) {
        match abandon_workflow(&mut state.workflow, reason, &*self.clock) {
            Ok(true) => self.commit(slot, state).await,
            Ok(false) => {}
            Err(err) => tracing::error!(
                workflow_id = %state.workflow.id(),
                error = %err,
                "failed to abandon workflow"
            ),
        }
    }

    /// Runs pending adapter calls until the workflow settles.
    ///
    /// The slot lock is held from recording an outcome until the next call
    /// is chosen, so an operator command never observes a settled stage
    /// while this task can still act on it.
    async fn drive(self: Arc<Self>, slot: Arc<WorkflowSlot>) {
        let mut state = slot.lock().await;
        loop {
            let Some(call) = self.next_call(&slot, &mut state).await else {
                state.driver = None;
                return;
            };
            drop(state);

            let outcome = self.invoke(&call).await;

            state = slot.lock().await;
            if state.workflow.stage() != call.stage() {
                tracing::debug!(
                    expected = %call.stage(),
                    actual = %state.workflow.stage(),
                    "discarding adapter result for a workflow that moved on"
                );
                return;
            }
            let sync_required = state.project.vcs().is_some();
            if let Err(err) = self.record(&mut state.workflow, sync_required, outcome) {
                tracing::error!(error = %err, "failed to record adapter outcome");
                state.driver = None;
                return;
            }
            log_outcome(&state.workflow);
            self.commit(&slot, &mut state).await;
        }
    }

    async fn next_call(&self, slot: &WorkflowSlot, state: &mut SlotState) -> Option<PendingCall> {
        if state.workflow.stage() == WorkflowStage::Submitted {
            if let Err(err) = state.workflow.begin_generation(&*self.clock) {
                tracing::error!(error = %err, "failed to start code generation");
                return None;
            }
            self.commit(slot, state).await;
        }
        match self.pending_call(&state.workflow, &state.project) {
            Ok(call) => call,
            Err(missing) => {
                self.abandon(slot, state, missing).await;
                None
            }
        }
    }

    fn pending_call(
        &self,
        workflow: &Workflow,
        shared_project: &Arc<ProjectConfig>,
    ) -> Result<Option<PendingCall>, &'static str> {
        let project = Arc::clone(shared_project);
        let call = match workflow.stage() {
            WorkflowStage::GeneratingCode => PendingCall::Generate {
                prompt: workflow.prompt().clone(),
                project,
            },
            WorkflowStage::PlanPending => PendingCall::Plan {
                code: generated_code(workflow)?,
                project,
            },
            WorkflowStage::Applying => PendingCall::Apply {
                plan_id: workflow
                    .plan()
                    .map(|plan| plan.plan_id().clone())
                    .ok_or("plan missing from workflow snapshot")?,
                project,
            },
            WorkflowStage::SyncingVcs => PendingCall::Sync {
                code: generated_code(workflow)?,
                message: self
                    .commit_messages
                    .render(workflow)
                    .map_err(|err| err.to_string()),
                project,
            },
            _ => return Ok(None),
        };
        Ok(Some(call))
    }

    async fn invoke(&self, call: &PendingCall) -> CallOutcome {
        tracing::debug!(stage = %call.stage(), "invoking adapter");
        match call {
            PendingCall::Generate { prompt, project } => {
                CallOutcome::Generated(self.ports.generator.generate(prompt, project).await)
            }
            PendingCall::Plan { code, project } => {
                CallOutcome::Planned(self.ports.executor.plan(code, project).await)
            }
            PendingCall::Apply { plan_id, project } => {
                CallOutcome::Applied(self.ports.executor.apply(plan_id, project).await)
            }
            PendingCall::Sync {
                code,
                message,
                project,
            } => CallOutcome::Synced(match message {
                Ok(rendered) => self
                    .ports
                    .vcs
                    .sync(code, rendered, project)
                    .await
                    .map_err(|err| err.detail().to_owned()),
                Err(render_error) => Err(render_error.clone()),
            }),
        }
    }

    fn record(
        &self,
        workflow: &mut Workflow,
        sync_required: bool,
        outcome: CallOutcome,
    ) -> Result<(), WorkflowDomainError> {
        let clock = &*self.clock;
        match outcome {
            CallOutcome::Generated(Ok(code)) if code.is_blank() => workflow.fail(
                WorkflowFailure::new(
                    FailureKind::GenerationFailed,
                    "code generator returned no code",
                ),
                clock,
            ),
            CallOutcome::Generated(Ok(code)) => {
                let issues = code.validation_issues();
                if issues.is_empty() {
                    workflow.record_generated_code(code, clock)
                } else {
                    workflow.fail(
                        WorkflowFailure::new(
                            FailureKind::GenerationFailed,
                            "generated code failed validation",
                        )
                        .with_output(issues.join("\n")),
                        clock,
                    )
                }
            }
            CallOutcome::Generated(Err(err)) => {
                workflow.fail(adapter_failure(FailureKind::GenerationFailed, &err), clock)
            }
            CallOutcome::Planned(Ok(plan)) => workflow.record_plan(plan, clock),
            CallOutcome::Planned(Err(err)) => {
                workflow.fail(adapter_failure(FailureKind::PlanFailed, &err), clock)
            }
            CallOutcome::Applied(Ok(applied)) => {
                workflow.record_apply_outcome(applied, sync_required, clock)
            }
            CallOutcome::Applied(Err(err)) => {
                workflow.fail(adapter_failure(FailureKind::ApplyFailed, &err), clock)
            }
            CallOutcome::Synced(Ok(())) => workflow.record_sync(None, clock),
            CallOutcome::Synced(Err(detail)) => {
                workflow.record_sync(Some(SyncWarning::new(detail)), clock)
            }
        }
    }
}

/// Ends `workflow` with the failure kind of its current stage. A sync stage
/// completes with a warning instead. Returns `false` when the workflow had
/// already finished.
pub(super) fn abandon_workflow(
    workflow: &mut Workflow,
    reason: &str,
    clock: &impl Clock,
) -> Result<bool, WorkflowDomainError> {
    match FailureKind::for_stage(workflow.stage()) {
        None => return Ok(false),
        Some(FailureKind::SyncFailed) => {
            workflow.record_sync(Some(SyncWarning::new(reason)), clock)?;
        }
        Some(kind) => workflow.fail(WorkflowFailure::new(kind, reason), clock)?,
    }
    tracing::warn!(workflow_id = %workflow.id(), reason, "workflow abandoned");
    Ok(true)
}

fn generated_code(workflow: &Workflow) -> Result<String, &'static str> {
    workflow
        .generated_code()
        .map(|code| code.code().to_owned())
        .ok_or("generated code missing from workflow snapshot")
}

fn adapter_failure(kind: FailureKind, err: &AdapterError) -> WorkflowFailure {
    WorkflowFailure::new(kind, err.detail()).with_captured_output(err.output())
}

fn log_outcome(workflow: &Workflow) {
    if let Some(failure) = workflow.failure() {
        tracing::warn!(
            kind = %ErrorKind::from(failure.kind()),
            error = failure.message(),
            "adapter call failed"
        );
    }
    if let Some(warning) = workflow.sync_warning() {
        tracing::warn!(error = warning.message(), "version-control sync degraded");
    }
}
