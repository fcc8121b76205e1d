//! End-to-end stage progression through the supervisor.

use super::helpers::{PLAIN_PROJECT, Pipeline, SYNCED_PROJECT, pipeline};
use infraflow::workflow::{
    domain::{
        ApplyOutcome, ErrorKind, FailureKind, PlanId, PlanSummary, WorkflowStage,
    },
    ports::{AdapterError, WorkflowRepository},
    services::SubmitChangeRequest,
};
use eyre::{Result, ensure, eyre};
use rstest::rstest;

fn history(workflow: &infraflow::workflow::domain::Workflow) -> Vec<WorkflowStage> {
    workflow.history().iter().map(|entry| entry.stage).collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_change_without_vcs_completes(pipeline: Pipeline) -> Result<()> {
    let supervisor = &pipeline.supervisor;
    let id = supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;

    let awaiting = supervisor.wait_until_settled(id).await?;
    ensure!(awaiting.stage() == WorkflowStage::AwaitingApproval);
    let plan = awaiting.plan().ok_or_else(|| eyre!("plan should be stored"))?;
    ensure!(plan.has_changes());

    supervisor.approve(id).await?;
    supervisor.wait_until_settled(id).await?;
    let status = supervisor.get_status(id).await?;

    ensure!(status.stage() == WorkflowStage::Completed);
    ensure!(status.apply_outcome().is_some_and(|outcome| !outcome.output().is_empty()));
    ensure!(status.sync_warning().is_none());
    ensure!(status.failure().is_none());
    ensure!(pipeline.vcs.commits().is_empty());
    ensure!(
        history(&status)
            == vec![
                WorkflowStage::Submitted,
                WorkflowStage::GeneratingCode,
                WorkflowStage::PlanPending,
                WorkflowStage::AwaitingApproval,
                WorkflowStage::Applying,
                WorkflowStage::Completed,
            ]
    );

    let persisted = pipeline
        .repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre!("workflow should be persisted"))?;
    ensure!(persisted == status);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generated_code_flows_into_plan_and_commit(pipeline: Pipeline) -> Result<()> {
    let supervisor = &pipeline.supervisor;
    let id = supervisor
        .submit(SubmitChangeRequest::new(
            SYNCED_PROJECT,
            "Provision a managed Redis cache in front of the orders API with TLS enforced",
        ))
        .await?;
    supervisor.wait_until_settled(id).await?;
    supervisor.approve(id).await?;
    let status = supervisor.wait_until_settled(id).await?;

    ensure!(status.stage() == WorkflowStage::Completed);
    let code = status
        .generated_code()
        .ok_or_else(|| eyre!("generated code should be stored"))?
        .code()
        .to_owned();
    ensure!(pipeline.executor.planned_code() == vec![code.clone()]);

    let commits = pipeline.vcs.commits();
    let commit = commits.first().ok_or_else(|| eyre!("expected one commit"))?;
    ensure!(commit.code == code);
    ensure!(
        commit.message == "feat: Provision a managed Redis cache in front of the or...",
        "unexpected commit message {:?}",
        commit.message
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generation_failure_is_recorded_on_the_workflow(pipeline: Pipeline) -> Result<()> {
    pipeline
        .generator
        .push_failure(AdapterError::new("model quota exhausted"))?;
    let id = pipeline
        .supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;

    pipeline.supervisor.wait_until_settled(id).await?;
    let status = pipeline.supervisor.get_status(id).await?;

    ensure!(status.stage() == WorkflowStage::Failed);
    let failure = status.failure().ok_or_else(|| eyre!("failure should be recorded"))?;
    ensure!(failure.kind() == FailureKind::GenerationFailed);
    ensure!(failure.message() == "model quota exhausted");
    ensure!(
        history(&status)
            == vec![
                WorkflowStage::Submitted,
                WorkflowStage::GeneratingCode,
                WorkflowStage::Failed,
            ]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plan_failure_keeps_generated_code(pipeline: Pipeline) -> Result<()> {
    pipeline.executor.push_plan(Err(AdapterError::new("provider auth failed")
        .with_output("Error: No valid credential sources found")))?;
    let id = pipeline
        .supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;

    let status = pipeline.supervisor.wait_until_settled(id).await?;

    ensure!(status.stage() == WorkflowStage::Failed);
    ensure!(status.generated_code().is_some());
    ensure!(status.plan().is_none());
    let failure = status.failure().ok_or_else(|| eyre!("failure should be recorded"))?;
    ensure!(failure.kind() == FailureKind::PlanFailed);
    ensure!(failure.output() == Some("Error: No valid credential sources found"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apply_failure_captures_output_without_rollback(pipeline: Pipeline) -> Result<()> {
    pipeline.executor.push_apply(Err(AdapterError::new("apply exited with 1")
        .with_output("Error: creating ElastiCache cluster: quota exceeded")))?;
    let supervisor = &pipeline.supervisor;
    let id = supervisor
        .submit(SubmitChangeRequest::new(SYNCED_PROJECT, "add a cache"))
        .await?;
    supervisor.wait_until_settled(id).await?;
    supervisor.approve(id).await?;

    let status = supervisor.wait_until_settled(id).await?;

    ensure!(status.stage() == WorkflowStage::Failed);
    let failure = status.failure().ok_or_else(|| eyre!("failure should be recorded"))?;
    ensure!(failure.kind() == FailureKind::ApplyFailed);
    ensure!(failure.output().is_some_and(|output| output.contains("quota exceeded")));
    ensure!(pipeline.vcs.commits().is_empty());
    ensure!(pipeline.executor.applied_plans().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sync_failure_completes_with_warning(pipeline: Pipeline) -> Result<()> {
    pipeline
        .vcs
        .push_failure(AdapterError::new("remote rejected: protected branch"))?;
    let supervisor = &pipeline.supervisor;
    let id = supervisor
        .submit(SubmitChangeRequest::new(SYNCED_PROJECT, "add a cache"))
        .await?;
    supervisor.wait_until_settled(id).await?;
    supervisor.approve(id).await?;

    let status = supervisor.wait_until_settled(id).await?;

    ensure!(status.stage() == WorkflowStage::Completed);
    ensure!(status.failure().is_none());
    ensure!(status.apply_outcome().is_some());
    let warning = status
        .sync_warning()
        .ok_or_else(|| eyre!("sync warning should be recorded"))?;
    ensure!(warning.kind() == FailureKind::SyncFailed);
    ensure!(warning.message() == "remote rejected: protected branch");
    ensure!(history(&status).contains(&WorkflowStage::SyncingVcs));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn zero_change_plan_cannot_be_approved_only_rejected(pipeline: Pipeline) -> Result<()> {
    pipeline.executor.push_plan(Ok(PlanSummary::new(
        PlanId::new("plan-noop")?,
        false,
        "No changes. Your infrastructure matches the configuration.",
    )))?;
    let supervisor = &pipeline.supervisor;
    let id = supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;
    supervisor.wait_until_settled(id).await?;

    let approve = supervisor.approve(id).await;
    ensure!(approve.as_ref().err().and_then(|err| err.kind()) == Some(ErrorKind::InvalidTransition));
    ensure!(supervisor.get_status(id).await?.stage() == WorkflowStage::AwaitingApproval);

    let rejected = supervisor.reject(id).await?;
    ensure!(rejected.stage() == WorkflowStage::Rejected);
    ensure!(rejected.failure().is_none());
    ensure!(pipeline.executor.applied_plans().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approve_and_reject_guard_the_approval_stage(pipeline: Pipeline) -> Result<()> {
    let supervisor = &pipeline.supervisor;
    pipeline.executor.plan_gate().close();
    let id = supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;

    let early_approve = supervisor.approve(id).await;
    let early_reject = supervisor.reject(id).await;
    ensure!(early_approve.as_ref().err().and_then(|err| err.kind()) == Some(ErrorKind::InvalidTransition));
    ensure!(early_reject.as_ref().err().and_then(|err| err.kind()) == Some(ErrorKind::InvalidTransition));

    pipeline.executor.plan_gate().open();
    supervisor.wait_until_settled(id).await?;
    supervisor.approve(id).await?;
    let second = supervisor.approve(id).await;
    ensure!(second.as_ref().err().and_then(|err| err.kind()) == Some(ErrorKind::InvalidTransition));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_is_refused_once_applying(pipeline: Pipeline) -> Result<()> {
    let supervisor = &pipeline.supervisor;
    pipeline.executor.apply_gate().close();
    let id = supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;
    supervisor.wait_until_settled(id).await?;
    supervisor.approve(id).await?;

    let cancel = supervisor.cancel(id).await;
    ensure!(cancel.as_ref().err().and_then(|err| err.kind()) == Some(ErrorKind::InvalidTransition));
    ensure!(supervisor.get_status(id).await?.stage() == WorkflowStage::Applying);

    pipeline.executor.apply_gate().open();
    let status = supervisor.wait_until_settled(id).await?;
    ensure!(status.stage() == WorkflowStage::Completed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_during_planning_skips_remaining_stages(pipeline: Pipeline) -> Result<()> {
    let supervisor = &pipeline.supervisor;
    pipeline.executor.plan_gate().close();
    pipeline.executor.push_plan(Ok(PlanSummary::new(PlanId::new("plan-late")?, true, "late")))?;
    let id = supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;

    let cancelled = supervisor.cancel(id).await?;
    pipeline.executor.plan_gate().open();
    let status = supervisor.wait_until_settled(id).await?;

    ensure!(cancelled.stage() == WorkflowStage::Cancelled);
    ensure!(status.stage() == WorkflowStage::Cancelled);
    ensure!(status.plan().is_none());
    ensure!(pipeline.executor.applied_plans().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apply_outcome_is_stored_verbatim(pipeline: Pipeline) -> Result<()> {
    pipeline
        .executor
        .push_apply(Ok(ApplyOutcome::new("Apply complete! Resources: 3 added.")))?;
    let supervisor = &pipeline.supervisor;
    let id = supervisor
        .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
        .await?;
    supervisor.wait_until_settled(id).await?;
    supervisor.approve(id).await?;
    let status = supervisor.wait_until_settled(id).await?;

    ensure!(
        status.apply_outcome().map(ApplyOutcome::output)
            == Some("Apply complete! Resources: 3 added.")
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn approval_as_soon_as_plan_is_announced_applies_once(pipeline: Pipeline) -> Result<()> {
    let supervisor = &pipeline.supervisor;
    for round in 1..=200_usize {
        let mut events = supervisor.subscribe();
        let id = supervisor
            .submit(SubmitChangeRequest::new(PLAIN_PROJECT, "add a cache"))
            .await?;
        loop {
            let event = events.recv().await?;
            if event.workflow_id == id && event.stage == WorkflowStage::AwaitingApproval {
                break;
            }
        }

        supervisor.approve(id).await?;
        let done = supervisor.wait_until_settled(id).await?;

        ensure!(done.stage() == WorkflowStage::Completed);
        ensure!(
            pipeline.executor.applied_plans().len() == round,
            "round {round}: apply ran {} times in total",
            pipeline.executor.applied_plans().len()
        );
    }
    Ok(())
}
