//! Domain model for the change workflow.
//!
//! The workflow domain models change requests, the closed set of stages with
//! their transition table, the data each stage produces, and the error
//! taxonomy. Adapter calls and concurrency stay outside the domain boundary.

mod artifacts;
mod change_request;
mod error;
mod ids;
mod project;
mod stage;
mod workflow;

pub use artifacts::{
    ApplyOutcome, GeneratedCode, PlanSummary, StageEntry, SyncWarning, WorkflowFailure,
};
pub use change_request::{ChangeRequest, PromptText};
pub use error::{ErrorKind, FailureKind, ParseWorkflowStageError, WorkflowDomainError};
pub use ids::{PlanId, ProjectId, WorkflowId};
pub use project::{ProjectConfig, VcsRemote};
pub use stage::WorkflowStage;
pub use workflow::{PersistedWorkflowData, Workflow};
