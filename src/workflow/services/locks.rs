//! Keyed per-project lock table with scoped release.

use crate::workflow::domain::{ProjectId, WorkflowId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracks which workflow currently owns each project's infrastructure.
#[derive(Debug, Clone, Default)]
pub struct ProjectLockTable {
    held: Arc<Mutex<HashMap<ProjectId, WorkflowId>>>,
}

/// Exclusive claim on a project, released when dropped.
#[derive(Debug)]
pub struct ProjectLease {
    table: ProjectLockTable,
    project_id: ProjectId,
    holder: WorkflowId,
}

/// The project is already leased to another workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseConflict {
    /// Workflow currently holding the lease.
    pub holder: WorkflowId,
}

impl ProjectLockTable {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leases `project_id` to `workflow_id` if nobody holds it.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseConflict`] naming the current holder when the project
    /// is already leased.
    pub fn try_acquire(
        &self,
        project_id: &ProjectId,
        workflow_id: WorkflowId,
    ) -> Result<ProjectLease, LeaseConflict> {
        let mut held = self.entries();
        if let Some(holder) = held.get(project_id) {
            return Err(LeaseConflict { holder: *holder });
        }
        held.insert(project_id.clone(), workflow_id);
        Ok(ProjectLease {
            table: self.clone(),
            project_id: project_id.clone(),
            holder: workflow_id,
        })
    }

    /// Returns the workflow holding `project_id`, if any.
    #[must_use]
    pub fn holder(&self, project_id: &ProjectId) -> Option<WorkflowId> {
        self.entries().get(project_id).copied()
    }

    // Every update is a single insert or remove, so a poisoned map is still
    // consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<ProjectId, WorkflowId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProjectLease {
    /// Returns the leased project.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the workflow holding the lease.
    #[must_use]
    pub const fn holder(&self) -> WorkflowId {
        self.holder
    }
}

impl Drop for ProjectLease {
    fn drop(&mut self) {
        let mut held = self.table.entries();
        if held.get(&self.project_id) == Some(&self.holder) {
            held.remove(&self.project_id);
            tracing::debug!(
                project_id = %self.project_id,
                workflow_id = %self.holder,
                "project lease released"
            );
        }
    }
}
