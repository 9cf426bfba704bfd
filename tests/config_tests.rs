//! Tests for configuration loading.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pretty_assertions::assert_eq;

use helm::config::{AgentConfig, DEFAULT_MODEL};
use helm::error::HelmError;
use helm::types::ExecutionConfig;

/// Variables `AgentConfig::from_env` reads.
const HELM_VARS: [&str; 3] = ["ANTHROPIC_API_KEY", "HELM_MODEL", "HELM_EXECUTION_CONFIG"];

/// Process environment is global; tests touching it run one at a time.
static ENV_SERIAL: Mutex<()> = Mutex::new(());

/// Exclusive, emptied view of the helm variables. Restores the previous
/// values on drop.
struct IsolatedEnv {
    previous: HashMap<&'static str, Option<OsString>>,
    _serial: MutexGuard<'static, ()>,
}

impl IsolatedEnv {
    fn new() -> Self {
        let serial = ENV_SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = HELM_VARS
            .into_iter()
            .map(|name| (name, std::env::var_os(name)))
            .collect();
        for name in HELM_VARS {
            std::env::remove_var(name);
        }
        Self {
            previous,
            _serial: serial,
        }
    }

    fn set(&self, name: &str, value: impl AsRef<OsStr>) {
        std::env::set_var(name, value);
    }
}

impl Drop for IsolatedEnv {
    fn drop(&mut self) {
        for (name, value) in self.previous.drain() {
            if let Some(value) = value {
                std::env::set_var(name, value);
            } else {
                std::env::remove_var(name);
            }
        }
    }
}

fn toml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn from_env_requires_api_key() {
    let _env = IsolatedEnv::new();

    let err = AgentConfig::from_env().unwrap_err();

    assert!(matches!(err, HelmError::Configuration(_)));
    assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
}

#[test]
fn from_env_rejects_blank_api_key() {
    let env = IsolatedEnv::new();
    env.set("ANTHROPIC_API_KEY", "   ");

    assert!(matches!(
        AgentConfig::from_env(),
        Err(HelmError::Configuration(_))
    ));
}

#[test]
fn from_env_reads_key_and_default_model() {
    let env = IsolatedEnv::new();
    env.set("ANTHROPIC_API_KEY", "sk-env");

    let config = AgentConfig::from_env().unwrap();

    assert_eq!(config.api_key, "sk-env");
    assert_eq!(config.model, DEFAULT_MODEL);
}

#[test]
fn from_env_model_override() {
    let env = IsolatedEnv::new();
    env.set("ANTHROPIC_API_KEY", "sk-env");
    env.set("HELM_MODEL", "claude-3-5-sonnet-20241022");

    let config = AgentConfig::from_env().unwrap();

    assert_eq!(config.model, "claude-3-5-sonnet-20241022");
}

#[test]
fn from_env_loads_execution_config_file() {
    let env = IsolatedEnv::new();
    let file = toml_file(
        r#"
typing_delay_ms = 40
screenshot_scale = 0.75
viewport = "1280x800"
"#,
    );
    env.set("ANTHROPIC_API_KEY", "sk-env");
    env.set("HELM_EXECUTION_CONFIG", file.path());

    let config = AgentConfig::from_env().unwrap();

    assert_eq!(config.execution_config.typing_delay_ms, Some(40));
    assert_eq!(config.execution_config.screenshot_scale, Some(0.75));
    assert_eq!(
        config.execution_config.extra.get("viewport"),
        Some(&serde_json::json!("1280x800"))
    );
}

#[test]
fn from_env_reports_bad_execution_config() {
    let env = IsolatedEnv::new();
    let file = toml_file("typing_delay_ms = \"fast\"");
    env.set("ANTHROPIC_API_KEY", "sk-env");
    env.set("HELM_EXECUTION_CONFIG", file.path());

    assert!(matches!(
        AgentConfig::from_env(),
        Err(HelmError::ConfigParse(_))
    ));
}

#[test]
fn from_env_reports_missing_execution_config() {
    let env = IsolatedEnv::new();
    let dir = tempfile::tempdir().unwrap();
    env.set("ANTHROPIC_API_KEY", "sk-env");
    env.set("HELM_EXECUTION_CONFIG", dir.path().join("missing.toml"));

    assert!(matches!(AgentConfig::from_env(), Err(HelmError::Io(_))));
}

#[test]
fn execution_config_merge_prefers_overrides() {
    let base = ExecutionConfig::from_toml_str("typing_delay_ms = 10\nmouse_move_steps = 20").unwrap();
    let overrides = ExecutionConfig::builder().typing_delay_ms(5).build();

    let merged = base.merged_with(&overrides);

    assert_eq!(merged.typing_delay_ms, Some(5));
    assert_eq!(merged.mouse_move_steps, Some(20));
}
