//! Code generation port.

use super::AdapterResult;
use crate::workflow::domain::{GeneratedCode, ProjectConfig, PromptText};
use async_trait::async_trait;

/// Turns a natural-language prompt into infrastructure-as-code.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Generates code for `prompt` using the project's model settings.
    async fn generate(
        &self,
        prompt: &PromptText,
        project: &ProjectConfig,
    ) -> AdapterResult<GeneratedCode>;
}
