//! Deterministic in-process adapters for the external pipeline ports.
//!
//! These adapters model code generation, plan/apply, and version-control
//! sync without calling any external system. Each records the inputs it
//! received, replays queued outcomes (falling back to a canned success), and
//! can be paused so that a call stays in flight until released. They suit
//! unit and integration tests and local dry runs of the orchestration.

use crate::workflow::{
    domain::{ApplyOutcome, GeneratedCode, PlanId, PlanSummary, ProjectConfig, PromptText},
    ports::{AdapterError, AdapterResult, CodeGenerator, InfrastructureExecutor, VersionControlSync},
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Gate that holds adapter calls until it is opened.
#[derive(Debug, Clone)]
pub struct CallGate {
    open: Arc<watch::Sender<bool>>,
}

impl Default for CallGate {
    fn default() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            open: Arc::new(open),
        }
    }
}

impl CallGate {
    /// Holds subsequent calls until [`CallGate::open`] is called.
    pub fn close(&self) {
        self.open.send_replace(false);
    }

    /// Releases held calls and lets new calls through.
    pub fn open(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        let mut receiver = self.open.subscribe();
        if receiver.wait_for(|is_open| *is_open).await.is_err() {
            tracing::debug!("call gate dropped while a call was held");
        }
    }
}

/// Queue of scripted outcomes plus a record of received inputs.
#[derive(Debug)]
struct Script<I, T> {
    outcomes: Mutex<VecDeque<AdapterResult<T>>>,
    received: Mutex<Vec<I>>,
}

impl<I, T> Default for Script<I, T> {
    fn default() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl<I: Clone, T> Script<I, T> {
    fn push(&self, outcome: AdapterResult<T>) -> AdapterResult<()> {
        self.outcomes
            .lock()
            .map_err(|err| AdapterError::new(err.to_string()))?
            .push_back(outcome);
        Ok(())
    }

    /// Records `input` and pops the next scripted outcome, if any.
    fn next(&self, input: I) -> AdapterResult<(usize, Option<AdapterResult<T>>)> {
        let mut received = self
            .received
            .lock()
            .map_err(|err| AdapterError::new(err.to_string()))?;
        received.push(input);
        let call_number = received.len();
        let outcome = self
            .outcomes
            .lock()
            .map_err(|err| AdapterError::new(err.to_string()))?
            .pop_front();
        Ok((call_number, outcome))
    }

    fn received(&self) -> Vec<I> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

/// Scripted [`CodeGenerator`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedCodeGenerator {
    script: Arc<Script<String, GeneratedCode>>,
    gate: CallGate,
}

impl ScriptedCodeGenerator {
    /// Creates a generator that echoes the prompt as a code comment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful generation.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the script lock is poisoned.
    pub fn push_code(&self, code: GeneratedCode) -> AdapterResult<()> {
        self.script.push(Ok(code))
    }

    /// Queues a generation failure.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the script lock is poisoned.
    pub fn push_failure(&self, error: AdapterError) -> AdapterResult<()> {
        self.script.push(Err(error))
    }

    /// Returns the gate controlling in-flight calls.
    #[must_use]
    pub const fn gate(&self) -> &CallGate {
        &self.gate
    }

    /// Returns every prompt received, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.script.received()
    }
}

#[async_trait]
impl CodeGenerator for ScriptedCodeGenerator {
    async fn generate(
        &self,
        prompt: &PromptText,
        project: &ProjectConfig,
    ) -> AdapterResult<GeneratedCode> {
        let (_, outcome) = self.script.next(prompt.as_str().to_owned())?;
        self.gate.pass().await;
        outcome.unwrap_or_else(|| {
            Ok(GeneratedCode::new(format!(
                "# {} ({})\n# {}\nresource \"terraform_data\" \"change\" {{}}\n",
                project.name(),
                project.cloud_provider(),
                prompt
            )))
        })
    }
}

/// Scripted [`InfrastructureExecutor`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    plans: Arc<Script<String, PlanSummary>>,
    applies: Arc<Script<PlanId, ApplyOutcome>>,
    plan_gate: CallGate,
    apply_gate: CallGate,
}

impl ScriptedExecutor {
    /// Creates an executor whose plans always contain one change.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a plan outcome.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the script lock is poisoned.
    pub fn push_plan(&self, outcome: AdapterResult<PlanSummary>) -> AdapterResult<()> {
        self.plans.push(outcome)
    }

    /// Queues an apply outcome.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the script lock is poisoned.
    pub fn push_apply(&self, outcome: AdapterResult<ApplyOutcome>) -> AdapterResult<()> {
        self.applies.push(outcome)
    }

    /// Returns the gate controlling in-flight plan calls.
    #[must_use]
    pub const fn plan_gate(&self) -> &CallGate {
        &self.plan_gate
    }

    /// Returns the gate controlling in-flight apply calls.
    #[must_use]
    pub const fn apply_gate(&self) -> &CallGate {
        &self.apply_gate
    }

    /// Returns every code text planned, in call order.
    #[must_use]
    pub fn planned_code(&self) -> Vec<String> {
        self.plans.received()
    }

    /// Returns every plan identifier applied, in call order.
    #[must_use]
    pub fn applied_plans(&self) -> Vec<PlanId> {
        self.applies.received()
    }
}

#[async_trait]
impl InfrastructureExecutor for ScriptedExecutor {
    async fn plan(&self, code: &str, _project: &ProjectConfig) -> AdapterResult<PlanSummary> {
        let (call_number, outcome) = self.plans.next(code.to_owned())?;
        self.plan_gate.pass().await;
        match outcome {
            Some(scripted) => scripted,
            None => {
                let plan_id = PlanId::new(format!("plan-{call_number}"))
                    .map_err(|err| AdapterError::new(err.to_string()))?;
                Ok(PlanSummary::new(
                    plan_id,
                    true,
                    "Plan: 1 to add, 0 to change, 0 to destroy.",
                ))
            }
        }
    }

    async fn apply(
        &self,
        plan_id: &PlanId,
        _project: &ProjectConfig,
    ) -> AdapterResult<ApplyOutcome> {
        let (_, outcome) = self.applies.next(plan_id.clone())?;
        self.apply_gate.pass().await;
        outcome.unwrap_or_else(|| {
            Ok(ApplyOutcome::new(
                "Apply complete! Resources: 1 added, 0 changed, 0 destroyed.",
            ))
        })
    }
}

/// Commit recorded by [`ScriptedVcsSync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    /// Committed code.
    pub code: String,
    /// Commit message.
    pub message: String,
}

/// Scripted [`VersionControlSync`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedVcsSync {
    script: Arc<Script<RecordedCommit, ()>>,
    gate: CallGate,
}

impl ScriptedVcsSync {
    /// Creates a sync adapter that accepts every commit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a sync failure.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the script lock is poisoned.
    pub fn push_failure(&self, error: AdapterError) -> AdapterResult<()> {
        self.script.push(Err(error))
    }

    /// Returns the gate controlling in-flight sync calls.
    #[must_use]
    pub const fn gate(&self) -> &CallGate {
        &self.gate
    }

    /// Returns every commit attempted, in call order.
    #[must_use]
    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.script.received()
    }
}

#[async_trait]
impl VersionControlSync for ScriptedVcsSync {
    async fn sync(
        &self,
        code: &str,
        commit_message: &str,
        _project: &ProjectConfig,
    ) -> AdapterResult<()> {
        let (_, outcome) = self.script.next(RecordedCommit {
            code: code.to_owned(),
            message: commit_message.to_owned(),
        })?;
        self.gate.pass().await;
        outcome.unwrap_or(Ok(()))
    }
}
