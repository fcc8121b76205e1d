//! Read-only project lookup port.

use crate::workflow::domain::{ProjectConfig, ProjectId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for project catalog lookups.
pub type ProjectCatalogResult<T> = Result<T, ProjectCatalogError>;

/// Source of project configuration, owned outside the orchestrator.
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    /// Finds a project by identifier.
    ///
    /// Returns `None` when the project is unknown.
    async fn find(&self, id: &ProjectId) -> ProjectCatalogResult<Option<ProjectConfig>>;
}

/// Errors returned by project catalog implementations.
#[derive(Debug, Clone, Error)]
pub enum ProjectCatalogError {
    /// Backing-store failure.
    #[error("project catalog error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProjectCatalogError {
    /// Wraps a backing-store error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
