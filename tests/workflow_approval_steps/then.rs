//! Then steps for workflow approval BDD scenarios.

use super::world::WorkflowWorld;
use infraflow::workflow::{
    domain::{ErrorKind, Workflow, WorkflowStage},
    services::WorkflowServiceError,
};
use rstest_bdd_macros::then;

fn last_status(world: &WorkflowWorld) -> Result<&Workflow, eyre::Report> {
    world
        .last_status
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing workflow snapshot in scenario world"))
}

fn ensure_kind<T: std::fmt::Debug>(
    result: Option<&Result<T, WorkflowServiceError>>,
    expected: &str,
) -> Result<(), eyre::Report> {
    let result = result.ok_or_else(|| eyre::eyre!("missing operation result"))?;
    let actual = result.as_ref().err().and_then(WorkflowServiceError::kind);
    if actual.map(ErrorKind::as_str) != Some(expected) {
        return Err(eyre::eyre!("expected {expected} error, got {result:?}"));
    }
    Ok(())
}

#[then(r#"the workflow stage is "{stage}""#)]
fn workflow_stage_is(world: &WorkflowWorld, stage: String) -> Result<(), eyre::Report> {
    let expected = WorkflowStage::try_from(stage.as_str())
        .map_err(|err| eyre::eyre!("invalid expected stage in scenario: {err}"))?;
    let workflow = last_status(world)?;
    if workflow.stage() != expected {
        return Err(eyre::eyre!(
            "expected stage {expected}, found {}",
            workflow.stage()
        ));
    }
    Ok(())
}

#[then(r#"the submission fails with "{kind}""#)]
fn submission_fails_with(world: &WorkflowWorld, kind: String) -> Result<(), eyre::Report> {
    ensure_kind(world.last_submit_result.as_ref(), &kind)
}

#[then(r#"the operation fails with "{kind}""#)]
fn operation_fails_with(world: &WorkflowWorld, kind: String) -> Result<(), eyre::Report> {
    ensure_kind(world.last_operation_result.as_ref(), &kind)
}

#[then(r#"the failure kind is "{kind}""#)]
fn failure_kind_is(world: &WorkflowWorld, kind: String) -> Result<(), eyre::Report> {
    let failure = last_status(world)?
        .failure()
        .ok_or_else(|| eyre::eyre!("workflow has no failure record"))?;
    let actual = ErrorKind::from(failure.kind());
    if actual.as_str() != kind {
        return Err(eyre::eyre!("expected failure kind {kind}, found {actual}"));
    }
    Ok(())
}

#[then(r#"the stage history is "{history}""#)]
fn stage_history_is(world: &WorkflowWorld, history: String) -> Result<(), eyre::Report> {
    let actual: Vec<&str> = last_status(world)?
        .history()
        .iter()
        .map(|entry| entry.stage.as_str())
        .collect();
    let expected: Vec<&str> = history.split(',').map(str::trim).collect();
    if actual != expected {
        return Err(eyre::eyre!("expected history {expected:?}, found {actual:?}"));
    }
    Ok(())
}

#[then("the apply output is recorded")]
fn apply_output_is_recorded(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    let recorded = last_status(world)?
        .apply_outcome()
        .is_some_and(|outcome| !outcome.output().is_empty());
    if !recorded {
        return Err(eyre::eyre!("expected apply output on the workflow"));
    }
    Ok(())
}

#[then("no sync warning is recorded")]
fn no_sync_warning(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    if let Some(warning) = last_status(world)?.sync_warning() {
        return Err(eyre::eyre!("unexpected sync warning: {}", warning.message()));
    }
    Ok(())
}

#[then(r#"the sync warning is "{message}""#)]
fn sync_warning_is(world: &WorkflowWorld, message: String) -> Result<(), eyre::Report> {
    let warning = last_status(world)?
        .sync_warning()
        .ok_or_else(|| eyre::eyre!("workflow has no sync warning"))?;
    if warning.message() != message {
        return Err(eyre::eyre!(
            "expected sync warning {message:?}, found {:?}",
            warning.message()
        ));
    }
    Ok(())
}
