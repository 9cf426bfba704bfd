//! Error types for Helm.

use std::sync::Arc;

use thiserror::Error;

/// Boxed error shared between a failed execution and its `onError` event.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Primary error type for all Helm operations.
#[derive(Error, Debug)]
pub enum HelmError {
    #[error("No response received from the agent loop")]
    NoResponse,

    #[error("Malformed response: {source}")]
    MalformedResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response does not match schema: {message}")]
    SchemaValidation {
        schema: Box<serde_json::Value>,
        value: Box<serde_json::Value>,
        message: String,
    },

    #[error("Agent loop failed: {0}")]
    Loop(#[source] SharedError),

    #[error("Execution cancelled at step {step}")]
    Cancelled { step: u64, reason: Option<String> },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HelmError {
    /// Wrap an arbitrary failure raised inside the agent loop.
    pub fn loop_failure(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Loop(Arc::from(error.into()))
    }

    /// Create a schema validation error.
    pub fn schema_validation(
        schema: &serde_json::Value,
        value: serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self::SchemaValidation {
            schema: Box::new(schema.clone()),
            value: Box::new(value),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_loop_failure(&self) -> bool {
        matches!(self, Self::Loop(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HelmError>;
