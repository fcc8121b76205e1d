//! Failure type shared by the external adapter ports.

use thiserror::Error;

/// Result type for external adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failure reported by an external adapter.
///
/// The workflow records `detail` as the failure message and keeps `output`
/// (for example executor stdout/stderr) for diagnosis.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{detail}")]
pub struct AdapterError {
    detail: String,
    output: Option<String>,
}

impl AdapterError {
    /// Creates an adapter error with a diagnostic message.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            output: None,
        }
    }

    /// Attaches raw adapter output.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Returns captured adapter output, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}
