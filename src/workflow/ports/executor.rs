//! Plan/apply executor port.

use super::AdapterResult;
use crate::workflow::domain::{ApplyOutcome, PlanId, PlanSummary, ProjectConfig};
use async_trait::async_trait;

/// Computes and applies infrastructure plans against the project's state
/// backend.
#[async_trait]
pub trait InfrastructureExecutor: Send + Sync {
    /// Computes a plan for `code` without changing infrastructure.
    ///
    /// A plan with no changes is a success, not an error.
    async fn plan(&self, code: &str, project: &ProjectConfig) -> AdapterResult<PlanSummary>;

    /// Applies a previously computed plan.
    async fn apply(&self, plan_id: &PlanId, project: &ProjectConfig)
    -> AdapterResult<ApplyOutcome>;
}
