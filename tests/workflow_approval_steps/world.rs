//! Shared world state for workflow approval BDD scenarios.

use std::sync::Arc;

use infraflow::config::OrchestratorConfig;
use infraflow::workflow::{
    adapters::{
        memory::{InMemoryProjectCatalog, InMemoryWorkflowRepository},
        scripted::{ScriptedCodeGenerator, ScriptedExecutor, ScriptedVcsSync},
    },
    domain::{Workflow, WorkflowId},
    services::{PipelinePorts, WorkflowServiceError, WorkflowSupervisor},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Supervisor type used by the BDD world.
pub type TestSupervisor = WorkflowSupervisor<
    ScriptedCodeGenerator,
    ScriptedExecutor,
    ScriptedVcsSync,
    InMemoryProjectCatalog,
    InMemoryWorkflowRepository,
    DefaultClock,
>;

/// Scenario world for workflow approval behaviour tests.
pub struct WorkflowWorld {
    pub supervisor: TestSupervisor,
    pub generator: ScriptedCodeGenerator,
    pub executor: ScriptedExecutor,
    pub vcs: ScriptedVcsSync,
    pub catalog: InMemoryProjectCatalog,
    pub workflow_id: Option<WorkflowId>,
    pub last_status: Option<Workflow>,
    pub last_submit_result: Option<Result<WorkflowId, WorkflowServiceError>>,
    pub last_operation_result: Option<Result<Workflow, WorkflowServiceError>>,
}

impl WorkflowWorld {
    /// Creates a world with no projects and no workflows.
    #[must_use]
    pub fn new() -> Self {
        let generator = ScriptedCodeGenerator::new();
        let executor = ScriptedExecutor::new();
        let vcs = ScriptedVcsSync::new();
        let catalog = InMemoryProjectCatalog::new();
        let supervisor = WorkflowSupervisor::new(
            PipelinePorts {
                generator: Arc::new(generator.clone()),
                executor: Arc::new(executor.clone()),
                vcs: Arc::new(vcs.clone()),
                catalog: Arc::new(catalog.clone()),
                repository: Arc::new(InMemoryWorkflowRepository::new()),
            },
            Arc::new(DefaultClock),
            &OrchestratorConfig::default(),
        );

        Self {
            supervisor,
            generator,
            executor,
            vcs,
            catalog,
            workflow_id: None,
            last_status: None,
            last_submit_result: None,
            last_operation_result: None,
        }
    }

    /// Returns the workflow under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no workflow was submitted.
    pub fn workflow_id(&self) -> Result<WorkflowId, eyre::Report> {
        self.workflow_id
            .ok_or_else(|| eyre::eyre!("missing submitted workflow in scenario world"))
    }

    /// Records a submission, remembering the first admitted workflow.
    pub fn record_submit(&mut self, result: Result<WorkflowId, WorkflowServiceError>) {
        if let Ok(id) = &result {
            self.workflow_id.get_or_insert(*id);
        }
        self.last_submit_result = Some(result);
    }
}

impl Default for WorkflowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> WorkflowWorld {
    WorkflowWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
