//! Resuming persisted workflows in a fresh supervisor.

use std::sync::Arc;

use super::helpers::{PLAIN_PROJECT, Pipeline, SYNCED_PROJECT, project_id};
use eyre::{Result, ensure, eyre};
use infraflow::workflow::{
    adapters::memory::InMemoryWorkflowRepository,
    domain::{
        ApplyOutcome, ChangeRequest, ErrorKind, FailureKind, GeneratedCode, PlanId, PlanSummary,
        PromptText, Workflow, WorkflowStage,
    },
    ports::WorkflowRepository,
    services::{SubmitChangeRequest, WorkflowServiceError},
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

#[fixture]
fn repository() -> Arc<InMemoryWorkflowRepository> {
    Arc::new(InMemoryWorkflowRepository::new())
}

fn submitted(project: &str) -> Result<Workflow> {
    let clock = DefaultClock;
    let request = ChangeRequest::new(project_id(project), PromptText::new("add a cache")?, &clock);
    Ok(Workflow::submit(request, &clock))
}

fn planned(project: &str) -> Result<Workflow> {
    let clock = DefaultClock;
    let mut workflow = submitted(project)?;
    workflow.begin_generation(&clock)?;
    workflow.record_generated_code(GeneratedCode::new("resource \"cache\" \"main\" {}"), &clock)?;
    Ok(workflow)
}

fn awaiting(project: &str) -> Result<Workflow> {
    let mut workflow = planned(project)?;
    workflow.record_plan(
        PlanSummary::new(PlanId::new("plan-before-restart")?, true, "1 to add"),
        &DefaultClock,
    )?;
    Ok(workflow)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resume_reinvokes_only_the_pending_call(
    repository: Arc<InMemoryWorkflowRepository>,
) -> Result<()> {
    let stored = planned(PLAIN_PROJECT)?;
    repository.store(&stored).await?;
    let pipeline = Pipeline::over(Arc::clone(&repository));

    let resumed = pipeline.supervisor.resume_active().await?;
    ensure!(resumed == vec![stored.id()]);
    let status = pipeline.supervisor.wait_until_settled(stored.id()).await?;

    ensure!(status.stage() == WorkflowStage::AwaitingApproval);
    ensure!(pipeline.generator.prompts().is_empty());
    ensure!(pipeline.executor.planned_code() == vec!["resource \"cache\" \"main\" {}".to_owned()]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resumed_approval_continues_with_stored_plan(
    repository: Arc<InMemoryWorkflowRepository>,
) -> Result<()> {
    let stored = awaiting(SYNCED_PROJECT)?;
    repository.store(&stored).await?;
    let pipeline = Pipeline::over(Arc::clone(&repository));
    pipeline.supervisor.resume_active().await?;

    pipeline.supervisor.approve(stored.id()).await?;
    let status = pipeline.supervisor.wait_until_settled(stored.id()).await?;

    ensure!(status.stage() == WorkflowStage::Completed);
    ensure!(pipeline.executor.planned_code().is_empty());
    ensure!(pipeline.executor.applied_plans() == vec![PlanId::new("plan-before-restart")?]);
    ensure!(pipeline.vcs.commits().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resumed_workflow_holds_its_project(
    repository: Arc<InMemoryWorkflowRepository>,
) -> Result<()> {
    let stored = awaiting(PLAIN_PROJECT)?;
    repository.store(&stored).await?;
    let pipeline = Pipeline::over(Arc::clone(&repository));
    pipeline.supervisor.resume_active().await?;

    let busy = pipeline
        .supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a queue"))
        .await;

    ensure!(busy.as_ref().err().and_then(WorkflowServiceError::kind) == Some(ErrorKind::ProjectBusy));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resume_in_sync_stage_commits_without_reapplying(
    repository: Arc<InMemoryWorkflowRepository>,
) -> Result<()> {
    let clock = DefaultClock;
    let mut stored = awaiting(SYNCED_PROJECT)?;
    stored.approve(&clock)?;
    stored.record_apply_outcome(ApplyOutcome::new("Apply complete!"), true, &clock)?;
    repository.store(&stored).await?;
    let pipeline = Pipeline::over(Arc::clone(&repository));

    pipeline.supervisor.resume_active().await?;
    let status = pipeline.supervisor.wait_until_settled(stored.id()).await?;

    ensure!(status.stage() == WorkflowStage::Completed);
    ensure!(pipeline.executor.applied_plans().is_empty());
    ensure!(pipeline.vcs.commits().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workflow_for_removed_project_fails_on_resume(
    repository: Arc<InMemoryWorkflowRepository>,
) -> Result<()> {
    let stored = planned(PLAIN_PROJECT)?;
    repository.store(&stored).await?;
    let pipeline = Pipeline::over(Arc::clone(&repository));
    pipeline.catalog.remove(&project_id(PLAIN_PROJECT))?;

    let resumed = pipeline.supervisor.resume_active().await?;
    ensure!(resumed.is_empty());

    let status = pipeline.supervisor.get_status(stored.id()).await?;
    ensure!(status.stage() == WorkflowStage::Failed);
    let failure = status.failure().ok_or_else(|| eyre!("failure should be recorded"))?;
    ensure!(failure.kind() == FailureKind::PlanFailed);
    ensure!(repository.find_active().await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn terminal_workflows_are_not_resumed(
    repository: Arc<InMemoryWorkflowRepository>,
) -> Result<()> {
    let mut stored = submitted(PLAIN_PROJECT)?;
    stored.cancel(&DefaultClock)?;
    repository.store(&stored).await?;
    let pipeline = Pipeline::over(Arc::clone(&repository));

    ensure!(pipeline.supervisor.resume_active().await?.is_empty());
    pipeline
        .supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;
    Ok(())
}
