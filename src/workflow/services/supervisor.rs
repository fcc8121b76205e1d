//! Supervisor owning live workflows and the operations callers drive them
//! with.

use super::commit_message::CommitMessageRenderer;
use super::driver::{SupervisorCore, WorkflowSlot, abandon_workflow};
use super::events::WorkflowEvent;
use crate::config::OrchestratorConfig;
use crate::workflow::{
    domain::{
        ChangeRequest, ErrorKind, ProjectId, PromptText, Workflow, WorkflowDomainError,
        WorkflowId, WorkflowStage,
    },
    ports::{
        CodeGenerator, InfrastructureExecutor, ProjectCatalog, ProjectCatalogError,
        VersionControlSync, WorkflowRepository, WorkflowRepositoryError,
    },
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Request payload for submitting a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitChangeRequest {
    project_id: String,
    prompt: String,
}

impl SubmitChangeRequest {
    /// Creates a request targeting `project_id`.
    #[must_use]
    pub fn new(project_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            prompt: prompt.into(),
        }
    }
}

/// Adapters and stores the supervisor depends on.
#[derive(Debug)]
pub struct PipelinePorts<G, X, V, P, R> {
    /// Code generation adapter.
    pub generator: Arc<G>,
    /// Plan and apply adapter.
    pub executor: Arc<X>,
    /// Version-control sync adapter.
    pub vcs: Arc<V>,
    /// Project configuration lookup.
    pub catalog: Arc<P>,
    /// Workflow snapshot store.
    pub repository: Arc<R>,
}

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowServiceError {
    /// Input validation or a transition guard failed.
    #[error(transparent)]
    Domain(#[from] WorkflowDomainError),

    /// The project is not in the catalog.
    #[error("project {0} is not registered")]
    UnknownProject(ProjectId),

    /// No workflow has this identifier.
    #[error("workflow {0} not found")]
    NotFound(WorkflowId),

    /// Another active workflow holds the project.
    #[error("project {project_id} is busy with workflow {holder}")]
    ProjectBusy {
        /// Contended project.
        project_id: ProjectId,
        /// Workflow holding the project.
        holder: WorkflowId,
    },

    /// The workflow exists in storage but this supervisor is not running it.
    #[error("workflow {workflow_id} is {stage} and not supervised by this process")]
    NotSupervised {
        /// Stored workflow.
        workflow_id: WorkflowId,
        /// Its stored stage.
        stage: WorkflowStage,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),

    /// Project catalog lookup failed.
    #[error(transparent)]
    ProjectCatalog(#[from] ProjectCatalogError),
}

impl WorkflowServiceError {
    /// Maps the error onto the caller-facing taxonomy.
    ///
    /// Returns `None` for infrastructure failures outside the taxonomy.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Domain(err) => Some(err.kind()),
            Self::UnknownProject(_) => Some(ErrorKind::InvalidInput),
            Self::NotFound(_) => Some(ErrorKind::NotFound),
            Self::ProjectBusy { .. } => Some(ErrorKind::ProjectBusy),
            Self::NotSupervised { .. } => Some(ErrorKind::InvalidTransition),
            Self::Repository(_) | Self::ProjectCatalog(_) => None,
        }
    }
}

/// Result type for workflow service operations.
pub type WorkflowServiceResult<T> = Result<T, WorkflowServiceError>;

/// Runs change workflows and serves operator commands against them.
///
/// Cloning yields another handle to the same supervisor.
pub struct WorkflowSupervisor<G, X, V, P, R, C> {
    core: Arc<SupervisorCore<G, X, V, P, R, C>>,
}

impl<G, X, V, P, R, C> Clone for WorkflowSupervisor<G, X, V, P, R, C> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<G, X, V, P, R, C> WorkflowSupervisor<G, X, V, P, R, C>
where
    G: CodeGenerator + 'static,
    X: InfrastructureExecutor + 'static,
    V: VersionControlSync + 'static,
    P: ProjectCatalog + 'static,
    R: WorkflowRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a supervisor with no live workflows.
    ///
    /// `config` is expected to have passed [`OrchestratorConfig::validate`].
    #[must_use]
    pub fn new(
        ports: PipelinePorts<G, X, V, P, R>,
        clock: Arc<C>,
        config: &OrchestratorConfig,
    ) -> Self {
        let commit_messages = CommitMessageRenderer::from_config(&config.commit);
        let capacity = config.events.channel_capacity.max(1);
        Self {
            core: Arc::new(SupervisorCore::new(
                ports,
                clock,
                commit_messages,
                capacity,
            )),
        }
    }

    /// Subscribes to stage changes of every workflow.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.core.events.subscribe()
    }

    /// Creates a workflow for the request and starts it in the background.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidInput`] error for an empty prompt, a
    /// malformed or unregistered project, and
    /// [`WorkflowServiceError::ProjectBusy`] when another active workflow
    /// holds the project. Nothing is created or locked on error.
    pub async fn submit(&self, request: SubmitChangeRequest) -> WorkflowServiceResult<WorkflowId> {
        let prompt = PromptText::new(request.prompt)?;
        let project_id = ProjectId::new(request.project_id)?;
        let project = self
            .core
            .ports
            .catalog
            .find(&project_id)
            .await?
            .ok_or_else(|| WorkflowServiceError::UnknownProject(project_id.clone()))?;

        let clock = &*self.core.clock;
        let workflow = Workflow::submit(ChangeRequest::new(project_id.clone(), prompt, clock), clock);
        let id = workflow.id();
        let lease = self
            .core
            .locks
            .try_acquire(&project_id, id)
            .map_err(|conflict| WorkflowServiceError::ProjectBusy {
                project_id: project_id.clone(),
                holder: conflict.holder,
            })?;
        self.core.ports.repository.store(&workflow).await?;
        tracing::info!(workflow_id = %id, project_id = %project_id, "change request submitted");

        let slot = self.core.register(workflow, Arc::new(project), lease);
        let mut state = slot.lock().await;
        self.core.spawn_driver(&slot, &mut state);
        Ok(id)
    }

    /// Returns the current snapshot of a workflow.
    ///
    /// Workflows not live in this process are read from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::NotFound`] for unknown identifiers.
    pub async fn get_status(&self, id: WorkflowId) -> WorkflowServiceResult<Workflow> {
        if let Some(slot) = self.core.slot(id) {
            return Ok(slot.snapshot());
        }
        self.core
            .ports
            .repository
            .find_by_id(id)
            .await?
            .ok_or(WorkflowServiceError::NotFound(id))
    }

    /// Approves the plan and starts applying it.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidTransition`] error unless the workflow
    /// awaits approval of a plan with changes.
    pub async fn approve(&self, id: WorkflowId) -> WorkflowServiceResult<Workflow> {
        let slot = self.live_slot(id).await?;
        let mut state = slot.lock().await;
        state.workflow.approve(&*self.core.clock)?;
        tracing::info!(workflow_id = %id, "plan approved");
        self.core.commit(&slot, &mut state).await;
        self.core.spawn_driver(&slot, &mut state);
        Ok(state.workflow.clone())
    }

    /// Rejects the plan, ending the workflow without error.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidTransition`] error unless the workflow
    /// awaits approval.
    pub async fn reject(&self, id: WorkflowId) -> WorkflowServiceResult<Workflow> {
        let slot = self.live_slot(id).await?;
        let mut state = slot.lock().await;
        state.workflow.reject(&*self.core.clock)?;
        tracing::info!(workflow_id = %id, "plan rejected");
        self.core.commit(&slot, &mut state).await;
        Ok(state.workflow.clone())
    }

    /// Cancels a workflow that has not reached approval, discarding any
    /// adapter call still in flight.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidTransition`] error once a plan awaits
    /// approval or later.
    pub async fn cancel(&self, id: WorkflowId) -> WorkflowServiceResult<Workflow> {
        let slot = self.live_slot(id).await?;
        let mut state = slot.lock().await;
        state.workflow.cancel(&*self.core.clock)?;
        state.abort_driver();
        tracing::info!(workflow_id = %id, "workflow cancelled");
        self.core.commit(&slot, &mut state).await;
        Ok(state.workflow.clone())
    }

    /// Waits until the workflow awaits approval or reaches a terminal stage.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::NotFound`] for unknown identifiers.
    pub async fn wait_until_settled(&self, id: WorkflowId) -> WorkflowServiceResult<Workflow> {
        let Some(slot) = self.core.slot(id) else {
            return self.get_status(id).await;
        };
        let mut snapshots = slot.watch();
        let settled = snapshots
            .wait_for(|workflow| workflow.stage().is_settled())
            .await
            .map(|workflow| workflow.clone())
            .map_err(|_| WorkflowServiceError::NotFound(id))?;
        Ok(settled)
    }

    /// Picks up active workflows from the repository after a restart.
    ///
    /// Each resumed workflow re-invokes only its pending adapter call.
    /// Workflows whose project left the catalog are failed at their current
    /// stage. Returns the identifiers now supervised.
    ///
    /// # Errors
    ///
    /// Returns repository or catalog errors; workflows resumed before the
    /// error keep running.
    pub async fn resume_active(&self) -> WorkflowServiceResult<Vec<WorkflowId>> {
        let active = self.core.ports.repository.find_active().await?;
        let mut resumed = Vec::with_capacity(active.len());
        for mut workflow in active {
            let id = workflow.id();
            if self.core.slot(id).is_some() {
                continue;
            }
            let project_id = workflow.project_id().clone();
            let Some(project) = self.core.ports.catalog.find(&project_id).await? else {
                self.fail_orphan(&mut workflow).await?;
                continue;
            };
            let lease = match self.core.locks.try_acquire(&project_id, id) {
                Ok(lease) => lease,
                Err(conflict) => {
                    tracing::warn!(
                        workflow_id = %id,
                        holder = %conflict.holder,
                        "project already leased; workflow not resumed"
                    );
                    continue;
                }
            };

            tracing::info!(workflow_id = %id, stage = %workflow.stage(), "resuming workflow");
            let slot = self.core.register(workflow, Arc::new(project), lease);
            let mut state = slot.lock().await;
            if !state.workflow.stage().is_settled() {
                self.core.spawn_driver(&slot, &mut state);
            }
            resumed.push(id);
        }
        Ok(resumed)
    }

    async fn fail_orphan(&self, workflow: &mut Workflow) -> WorkflowServiceResult<()> {
        if abandon_workflow(workflow, "project is no longer registered", &*self.core.clock)? {
            self.core.ports.repository.update(workflow).await?;
        }
        Ok(())
    }

    async fn live_slot(&self, id: WorkflowId) -> WorkflowServiceResult<Arc<WorkflowSlot>> {
        if let Some(slot) = self.core.slot(id) {
            return Ok(slot);
        }
        let stored = self.core.ports.repository.find_by_id(id).await?;
        Err(stored.map_or(WorkflowServiceError::NotFound(id), |workflow| {
            WorkflowServiceError::NotSupervised {
                workflow_id: id,
                stage: workflow.stage(),
            }
        }))
    }
}
