//! Operator-submitted change requests.

use super::{ProjectId, WorkflowDomainError, WorkflowId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural-language description of an infrastructure change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptText(String);

impl PromptText {
    /// Creates validated prompt text.
    ///
    /// Surrounding whitespace is trimmed; inner formatting is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyPrompt`] when the text is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(WorkflowDomainError::EmptyPrompt);
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the prompt as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PromptText {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PromptText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One prompt bound to one project. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    id: WorkflowId,
    project_id: ProjectId,
    prompt: PromptText,
    created_at: DateTime<Utc>,
}

impl ChangeRequest {
    /// Creates a change request with a fresh identifier.
    #[must_use]
    pub fn new(project_id: ProjectId, prompt: PromptText, clock: &impl Clock) -> Self {
        Self {
            id: WorkflowId::new(),
            project_id,
            prompt,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a change request from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: WorkflowId,
        project_id: ProjectId,
        prompt: PromptText,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            prompt,
            created_at,
        }
    }

    /// Returns the identifier shared with the owning workflow.
    #[must_use]
    pub const fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the target project.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the prompt text.
    #[must_use]
    pub const fn prompt(&self) -> &PromptText {
        &self.prompt
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
