//! Read-only project configuration consumed by the adapters.

use super::ProjectId;
use serde::{Deserialize, Serialize};

/// Version-control remote the applied code is synchronised to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRemote {
    /// Repository URL.
    pub repository_url: String,
    /// Target branch; adapters choose their default when unset.
    pub branch: Option<String>,
}

impl VcsRemote {
    /// Creates a remote targeting the adapter's default branch.
    #[must_use]
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            branch: None,
        }
    }

    /// Sets the target branch.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Capability bundle for one project.
///
/// The orchestrator never mutates it; only [`ProjectConfig::vcs`] affects the
/// stage sequence. Everything else is passed through to the adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    id: ProjectId,
    name: String,
    cloud_provider: String,
    state_backend: Option<String>,
    llm_provider: Option<String>,
    system_prompt: Option<String>,
    vcs: Option<VcsRemote>,
}

impl ProjectConfig {
    /// Creates a project configuration without state backend, model
    /// settings, or version control.
    #[must_use]
    pub fn new(id: ProjectId, name: impl Into<String>, cloud_provider: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cloud_provider: cloud_provider.into(),
            state_backend: None,
            llm_provider: None,
            system_prompt: None,
            vcs: None,
        }
    }

    /// Sets the remote state backend location.
    #[must_use]
    pub fn with_state_backend(mut self, location: impl Into<String>) -> Self {
        self.state_backend = Some(location.into());
        self
    }

    /// Sets the language-model provider name.
    #[must_use]
    pub fn with_llm_provider(mut self, provider: impl Into<String>) -> Self {
        self.llm_provider = Some(provider.into());
        self
    }

    /// Sets the project-specific system prompt for code generation.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Configures version-control synchronisation.
    #[must_use]
    pub fn with_vcs(mut self, remote: VcsRemote) -> Self {
        self.vcs = Some(remote);
        self
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> &ProjectId {
        &self.id
    }

    /// Returns the human-readable project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cloud provider name.
    #[must_use]
    pub fn cloud_provider(&self) -> &str {
        &self.cloud_provider
    }

    /// Returns the remote state backend location, if any.
    #[must_use]
    pub fn state_backend(&self) -> Option<&str> {
        self.state_backend.as_deref()
    }

    /// Returns the language-model provider name, if any.
    #[must_use]
    pub fn llm_provider(&self) -> Option<&str> {
        self.llm_provider.as_deref()
    }

    /// Returns the project-specific system prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the version-control remote, if configured.
    #[must_use]
    pub const fn vcs(&self) -> Option<&VcsRemote> {
        self.vcs.as_ref()
    }
}
