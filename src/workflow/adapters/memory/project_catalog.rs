//! In-memory project catalog.

use crate::workflow::{
    domain::{ProjectConfig, ProjectId},
    ports::{ProjectCatalog, ProjectCatalogError, ProjectCatalogResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Project catalog backed by a map, populated by the embedding application.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectCatalog {
    projects: Arc<RwLock<HashMap<ProjectId, ProjectConfig>>>,
}

impl InMemoryProjectCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a project.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectCatalogError::Backend`] when the lock is poisoned.
    pub fn register(&self, project: ProjectConfig) -> ProjectCatalogResult<()> {
        let mut projects = self
            .projects
            .write()
            .map_err(|err| ProjectCatalogError::backend(std::io::Error::other(err.to_string())))?;
        projects.insert(project.id().clone(), project);
        Ok(())
    }

    /// Removes a project, returning whether it was present.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectCatalogError::Backend`] when the lock is poisoned.
    pub fn remove(&self, id: &ProjectId) -> ProjectCatalogResult<bool> {
        let mut projects = self
            .projects
            .write()
            .map_err(|err| ProjectCatalogError::backend(std::io::Error::other(err.to_string())))?;
        Ok(projects.remove(id).is_some())
    }
}

#[async_trait]
impl ProjectCatalog for InMemoryProjectCatalog {
    async fn find(&self, id: &ProjectId) -> ProjectCatalogResult<Option<ProjectConfig>> {
        let projects = self
            .projects
            .read()
            .map_err(|err| ProjectCatalogError::backend(std::io::Error::other(err.to_string())))?;
        Ok(projects.get(id).cloned())
    }
}
