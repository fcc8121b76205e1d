//! Port contracts for the change workflow.
//!
//! Ports define infrastructure-agnostic interfaces used by workflow
//! services: the three external adapters the pipeline calls, the project
//! catalog it reads, and the repository it persists snapshots to.

pub mod adapter_error;
pub mod executor;
pub mod generator;
pub mod project_catalog;
pub mod repository;
pub mod vcs;

pub use adapter_error::{AdapterError, AdapterResult};
pub use executor::InfrastructureExecutor;
pub use generator::CodeGenerator;
pub use project_catalog::{ProjectCatalog, ProjectCatalogError, ProjectCatalogResult};
pub use repository::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult};
pub use vcs::VersionControlSync;

