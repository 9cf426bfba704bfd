//! Agent configuration (code > env > execution config file).

use std::fmt;
use std::path::PathBuf;

use crate::error::{HelmError, Result};
use crate::types::ExecutionConfig;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Static configuration held by an [`Agent`](crate::agent::Agent) for its
/// whole lifetime.
#[derive(Clone, PartialEq)]
pub struct AgentConfig {
    pub api_key: String,
    pub model: String,
    pub execution_config: ExecutionConfig,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("execution_config", &self.execution_config)
            .finish()
    }
}

impl AgentConfig {
    /// Config with the given key, the default model and empty execution config.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            execution_config: ExecutionConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_execution_config(mut self, config: ExecutionConfig) -> Self {
        self.execution_config = config;
        self
    }

    /// Load from environment variables.
    ///
    /// - `ANTHROPIC_API_KEY` (required)
    /// - `HELM_MODEL` (optional, defaults to [`DEFAULT_MODEL`])
    /// - `HELM_EXECUTION_CONFIG` (optional path to a TOML execution config;
    ///   falls back to [`ExecutionConfig::default_path`] when that file exists)
    ///
    /// A `.env` file is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| HelmError::Configuration("ANTHROPIC_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = std::env::var("HELM_MODEL")
            .ok()
            .filter(|model| !model.trim().is_empty())
        {
            config.model = model;
        }

        match std::env::var_os("HELM_EXECUTION_CONFIG").map(PathBuf::from) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading execution config");
                config.execution_config = ExecutionConfig::load(&path)?;
            }
            None => {
                if let Some(path) = ExecutionConfig::default_path().filter(|p| p.is_file()) {
                    tracing::debug!(path = %path.display(), "loading default execution config");
                    config.execution_config = ExecutionConfig::load(&path)?;
                }
            }
        }

        Ok(config)
    }
}
