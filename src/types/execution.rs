//! Execution behaviour options threaded through to the agent loop.

use std::path::{Path, PathBuf};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Execution behaviour configuration (typing speed, screenshot cadence,
/// pointer movement, ...).
///
/// Helm never interprets these values; it only hands them to the
/// [`AgentLoop`](crate::agent_loop::AgentLoop). Keys it does not know about
/// land in `extra` and survive a round trip.
///
/// ```
/// use helm::types::ExecutionConfig;
///
/// let config = ExecutionConfig::builder()
///     .typing_delay_ms(25)
///     .screenshot_scale(0.5)
///     .build();
/// assert_eq!(config.typing_delay_ms, Some(25));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mouse_move_steps: Option<u32>,
    #[builder(default)]
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a TOML file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Per-user default location (`<config dir>/helm/execution.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "helm")
            .map(|dirs| dirs.config_dir().join("execution.toml"))
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merged_with(&self, overrides: &ExecutionConfig) -> ExecutionConfig {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }
        ExecutionConfig {
            typing_delay_ms: overrides.typing_delay_ms.or(self.typing_delay_ms),
            screenshot_delay_ms: overrides.screenshot_delay_ms.or(self.screenshot_delay_ms),
            screenshot_scale: overrides.screenshot_scale.or(self.screenshot_scale),
            mouse_move_steps: overrides.mouse_move_steps.or(self.mouse_move_steps),
            extra,
        }
    }
}
