//! `PostgreSQL` adapters for workflow snapshot persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresWorkflowRepository, WorkflowPgPool};
