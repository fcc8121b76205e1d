//! In-memory adapters for workflow persistence and project lookup.

mod project_catalog;
mod repository;

pub use project_catalog::InMemoryProjectCatalog;
pub use repository::InMemoryWorkflowRepository;
