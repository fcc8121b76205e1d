//! Orchestrator configuration loaded from TOML.
//!
//! Every field has a default, so a missing file or a partial file is valid.
//!
//! ```toml
//! [commit]
//! template = "infra({{ project_id }}): {{ prompt }}"
//! prompt_limit = 72
//!
//! [events]
//! channel_capacity = 128
//! ```

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Version-control commit message settings.
    pub commit: CommitConfig,
    /// Workflow event broadcasting settings.
    pub events: EventConfig,
}

/// Commit message rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// `minijinja` template with `prompt`, `workflow_id`, and `project_id`
    /// in scope.
    pub template: String,
    /// Maximum number of prompt characters placed in the message.
    pub prompt_limit: usize,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            template: "feat: {{ prompt }}".to_owned(),
            prompt_limit: 50,
        }
    }
}

/// Event channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Events buffered per subscriber before slow subscribers lag.
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: Arc<io::Error>,
    },

    /// The path does not name a file.
    #[error("config path {0} does not name a file")]
    InvalidPath(PathBuf),

    /// The TOML document is malformed.
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl OrchestratorConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file (or missing parent directory) yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file exists but cannot be read,
    /// and parse or validation errors from [`OrchestratorConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| ConfigError::InvalidPath(path.to_path_buf()))?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let read_error = |source: io::Error| ConfigError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        };
        let text = match Dir::open_ambient_dir(parent, ambient_authority())
            .and_then(|dir| dir.read_to_string(file_name))
        {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found; using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(read_error(err)),
        };
        Self::from_toml_str(&text)
    }

    /// Checks value ranges and that the commit template compiles.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commit.prompt_limit == 0 {
            return Err(ConfigError::Invalid(
                "commit.prompt_limit must be > 0".to_owned(),
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "events.channel_capacity must be > 0".to_owned(),
            ));
        }
        let environment = minijinja::Environment::new();
        environment
            .template_from_str(&self.commit.template)
            .map_err(|err| ConfigError::Invalid(format!("commit.template: {err}")))?;
        Ok(())
    }
}
