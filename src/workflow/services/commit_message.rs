//! Commit message rendering for version-control sync.

use crate::config::CommitConfig;
use crate::workflow::domain::Workflow;
use minijinja::{Environment, context};
use thiserror::Error;

/// Template rendering failed.
#[derive(Debug, Clone, Error)]
#[error("failed to render commit message: {0}")]
pub struct CommitMessageError(String);

/// Renders commit messages from the configured template.
#[derive(Debug, Clone)]
pub struct CommitMessageRenderer {
    template: String,
    prompt_limit: usize,
}

impl Default for CommitMessageRenderer {
    fn default() -> Self {
        Self::from_config(&CommitConfig::default())
    }
}

impl CommitMessageRenderer {
    /// Creates a renderer from commit settings.
    #[must_use]
    pub fn from_config(config: &CommitConfig) -> Self {
        Self {
            template: config.template.clone(),
            prompt_limit: config.prompt_limit,
        }
    }

    /// Renders the commit message for `workflow`.
    ///
    /// # Errors
    ///
    /// Returns [`CommitMessageError`] when the template fails to render.
    pub fn render(&self, workflow: &Workflow) -> Result<String, CommitMessageError> {
        let prompt = summarize_prompt(workflow.prompt().as_str(), self.prompt_limit);
        Environment::new()
            .render_str(
                &self.template,
                context! {
                    prompt => prompt,
                    workflow_id => workflow.id().to_string(),
                    project_id => workflow.project_id().as_str(),
                },
            )
            .map(|message| message.trim().to_owned())
            .map_err(|err| CommitMessageError(err.to_string()))
    }
}

/// Collapses whitespace onto one line and truncates to `limit` characters,
/// appending `...` when anything was cut.
#[must_use]
pub fn summarize_prompt(prompt: &str, limit: usize) -> String {
    let single_line = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = single_line.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_none() {
        head
    } else {
        format!("{}...", head.trim_end())
    }
}
