//! Version-control synchronisation port.

use super::AdapterResult;
use crate::workflow::domain::ProjectConfig;
use async_trait::async_trait;

/// Commits applied code to the project's repository.
#[async_trait]
pub trait VersionControlSync: Send + Sync {
    /// Commits and pushes `code` with `commit_message`.
    async fn sync(
        &self,
        code: &str,
        commit_message: &str,
        project: &ProjectConfig,
    ) -> AdapterResult<()>;
}
