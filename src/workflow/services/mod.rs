//! Workflow orchestration services.

pub mod commit_message;
mod driver;
pub mod events;
pub mod locks;
pub mod supervisor;

pub use commit_message::{CommitMessageError, CommitMessageRenderer, summarize_prompt};
pub use events::WorkflowEvent;
pub use locks::{LeaseConflict, ProjectLease, ProjectLockTable};
pub use supervisor::{
    PipelinePorts, SubmitChangeRequest, WorkflowServiceError, WorkflowServiceResult,
    WorkflowSupervisor,
};
