//! Data produced by each workflow stage.

use super::{FailureKind, PlanId, WorkflowStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BLOCK_KEYWORDS: [&str; 3] = ["resource", "data", "module"];

/// Infrastructure code returned by the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    code: String,
    analysis: Option<String>,
}

impl GeneratedCode {
    /// Wraps generated infrastructure-as-code text.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            analysis: None,
        }
    }

    /// Attaches the model's explanation of the change.
    #[must_use]
    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.analysis = Some(analysis.into());
        self
    }

    /// Returns the generated code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the model's explanation, if any.
    #[must_use]
    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    /// Returns whether the generator produced no code at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }

    /// Returns structural problems that make the code unfit for planning.
    ///
    /// Only coarse checks run here; the executor's plan is the real
    /// validation. Comment lines are ignored.
    #[must_use]
    pub fn validation_issues(&self) -> Vec<String> {
        let statements: Vec<&str> = self
            .code
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
            .collect();
        if statements.is_empty() {
            return vec!["generated code has no statements".to_owned()];
        }

        let mut issues = Vec::new();
        let declares_block = statements.iter().any(|line| {
            BLOCK_KEYWORDS
                .iter()
                .any(|keyword| line.starts_with(keyword))
        });
        if !declares_block {
            issues.push("generated code declares no resource, data or module block".to_owned());
        }
        let opened: usize = statements.iter().map(|line| line.matches('{').count()).sum();
        let closed: usize = statements.iter().map(|line| line.matches('}').count()).sum();
        if opened != closed {
            issues.push(format!("unbalanced braces: {opened} opened, {closed} closed"));
        }
        issues
    }
}

/// Computed plan awaiting an operator decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    plan_id: PlanId,
    has_changes: bool,
    summary: String,
}

impl PlanSummary {
    /// Creates a plan summary.
    #[must_use]
    pub fn new(plan_id: PlanId, has_changes: bool, summary: impl Into<String>) -> Self {
        Self {
            plan_id,
            has_changes,
            summary: summary.into(),
        }
    }

    /// Returns the executor's plan identifier.
    #[must_use]
    pub const fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    /// Returns whether applying the plan would change anything.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// Returns the human-readable diff.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Output captured from a successful apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplyOutcome {
    output: String,
}

impl ApplyOutcome {
    /// Wraps apply output.
    #[must_use]
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Returns the apply output.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }
}

/// Structured record of the adapter failure that ended a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowFailure {
    kind: FailureKind,
    message: String,
    output: Option<String>,
}

impl WorkflowFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            output: None,
        }
    }

    /// Attaches adapter output captured for diagnosis.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Attaches output when the adapter captured any.
    #[must_use]
    pub fn with_captured_output(mut self, output: Option<&str>) -> Self {
        self.output = output.map(str::to_owned);
        self
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the adapter's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns captured adapter output, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

/// Non-fatal degradation attached to a completed workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWarning {
    kind: FailureKind,
    message: String,
}

impl SyncWarning {
    /// Creates a sync warning.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::SyncFailed,
            message: message.into(),
        }
    }

    /// Returns the warning kind; always [`FailureKind::SyncFailed`].
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the adapter's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One entry in the append-only stage history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    /// Stage entered.
    pub stage: WorkflowStage,
    /// Time the stage was entered.
    pub entered_at: DateTime<Utc>,
}
