//! Agent facade: one signal bus, many executions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bon::Builder;
use chrono::Utc;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::agent_loop::{AgentLoop, LoopRequest};
use crate::config::AgentConfig;
use crate::error::{HelmError, Result};
use crate::signals::{CancelEvent, ErrorEvent, SignalBus, SignalEvent};
use crate::structured::{extract_json_with_strategy, OutputSchema, StructuredQuery};
use crate::types::ExecutionConfig;

use super::controller::AgentController;

/// Reasoning-token budget used when none is given.
pub const DEFAULT_THINKING_BUDGET: u32 = 1024;

/// Per-call options for [`Agent::execute`] and friends.
#[derive(Debug, Clone, Default, Builder)]
pub struct ExecuteOptions {
    /// Extra instructions appended to the loop's system prompt.
    pub system_prompt_suffix: Option<String>,
    /// Reasoning-token budget; [`DEFAULT_THINKING_BUDGET`] when unset.
    pub thinking_budget: Option<u32>,
    /// Layered over the agent's execution config for this call only.
    pub execution_config: Option<ExecutionConfig>,
}

/// Drives an [`AgentLoop`] against an automation target.
///
/// The signal bus and its [`AgentController`] are created up front and live as
/// long as the agent, so listeners can be attached and signals sent before or
/// during the first execution. One execution runs at a time; an overlapping
/// call fails with [`HelmError::InvalidState`].
pub struct Agent<L: AgentLoop> {
    config: AgentConfig,
    target: Arc<L::Target>,
    agent_loop: L,
    bus: Arc<SignalBus>,
    controller: AgentController,
    busy: AtomicBool,
}

impl<L: AgentLoop> Agent<L> {
    pub fn new(config: AgentConfig, target: L::Target, agent_loop: L) -> Self {
        let bus = Arc::new(SignalBus::new());
        let controller = AgentController::new(bus.clone());
        Self {
            config,
            target: Arc::new(target),
            agent_loop,
            bus,
            controller,
            busy: AtomicBool::new(false),
        }
    }

    /// Pause/resume/cancel and lifecycle subscriptions.
    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn target(&self) -> &L::Target {
        &self.target
    }

    /// Whether an execution is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run a task and return the final message text.
    pub async fn execute(&self, query: impl Into<String>, options: ExecuteOptions) -> Result<String> {
        let query = StructuredQuery::plain(query);
        self.run(&query, options).await
    }

    /// Run a task whose answer must be a JSON value matching `schema`.
    pub async fn execute_value(
        &self,
        query: impl Into<String>,
        schema: &OutputSchema,
        options: ExecuteOptions,
    ) -> Result<serde_json::Value> {
        let compiled = schema.compile()?;
        let query = StructuredQuery::with_schema(query, schema);
        let text = self.run(&query, options).await?;
        let value = parse_response(&text)?;
        compiled.validate(&value)?;
        Ok(value)
    }

    /// Run a task whose answer is deserialized into `T`, using the schema
    /// `schemars` derives for `T`.
    pub async fn execute_typed<T>(&self, query: impl Into<String>, options: ExecuteOptions) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = OutputSchema::for_type::<T>()?;
        let compiled = schema.compile()?;
        let query = StructuredQuery::with_schema(query, &schema);
        let text = self.run(&query, options).await?;
        compiled.validate_into(parse_response(&text)?)
    }

    async fn run(&self, query: &StructuredQuery, options: ExecuteOptions) -> Result<String> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let execution_id = self.bus.begin_execution();
        let _window = WindowGuard(&self.bus);

        let execution_config = match &options.execution_config {
            Some(overrides) => self.config.execution_config.merged_with(overrides),
            None => self.config.execution_config.clone(),
        };
        let request = LoopRequest {
            query: query.text().to_string(),
            api_key: self.config.api_key.clone(),
            model: self.config.model.clone(),
            target: self.target.clone(),
            system_prompt_suffix: options.system_prompt_suffix,
            thinking_budget: options.thinking_budget.unwrap_or(DEFAULT_THINKING_BUDGET),
            signals: self.bus.clone(),
            execution_config,
        };

        let span = tracing::debug_span!(
            "helm_execute",
            execution_id = %execution_id,
            model = %self.config.model,
            structured = query.is_structured(),
        );
        tracing::debug!(parent: &span, "execution start");
        let outcome = self.agent_loop.run(request).instrument(span.clone()).await;

        let messages = match outcome {
            Ok(messages) => messages,
            Err(err) if err.is_cancelled() => {
                tracing::debug!(parent: &span, error = %err, "execution cancelled");
                return Err(self.report_cancel(err));
            }
            Err(err) => return Err(self.report_failure(err)),
        };

        let last = messages.last().ok_or(HelmError::NoResponse)?;
        tracing::debug!(parent: &span, messages = messages.len(), "execution complete");
        Ok(last.text())
    }

    /// Make sure `onCancel` fired for a cancelled execution, then hand the
    /// error back.
    fn report_cancel(&self, err: HelmError) -> HelmError {
        if self.bus.execution_progress().cancel_reported {
            return err;
        }
        if let HelmError::Cancelled { step, reason } = &err {
            tracing::warn!(step, "agent loop cancelled without reporting; emitting onCancel");
            self.bus.emit(SignalEvent::Cancel(CancelEvent {
                at: Utc::now(),
                step: *step,
                reason: reason.clone(),
            }));
        }
        err
    }

    /// Make sure `onError` fired for a loop failure, then hand the error back.
    fn report_failure(&self, err: HelmError) -> HelmError {
        let progress = self.bus.execution_progress();
        if progress.error_reported {
            return err;
        }
        let step = progress.last_step;
        let (shared, err) = match err {
            HelmError::Loop(shared) => (shared.clone(), HelmError::Loop(shared)),
            other => {
                let shared: crate::error::SharedError = Arc::new(other);
                (shared.clone(), HelmError::Loop(shared))
            }
        };
        tracing::warn!(step, error = %shared, "agent loop failed without reporting; emitting onError");
        self.bus.emit(SignalEvent::Error(ErrorEvent {
            at: Utc::now(),
            step,
            error: shared,
        }));
        err
    }
}

impl<L: AgentLoop> std::fmt::Debug for Agent<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("busy", &self.is_busy())
            .field("bus", &self.bus)
            .finish()
    }
}

fn parse_response(text: &str) -> Result<serde_json::Value> {
    let (value, strategy) = extract_json_with_strategy(text)?;
    tracing::debug!(?strategy, "structured response extracted");
    Ok(value)
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                HelmError::InvalidState(
                    "an execution is already in progress on this agent".into(),
                )
            })?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct WindowGuard<'a>(&'a SignalBus);

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        let summary = self.0.end_execution();
        tracing::trace!(last_step = summary.last_step, "execution window closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_loop::FnLoop;
    use crate::types::LoopMessage;

    fn echo_agent() -> Agent<FnLoop<()>> {
        let agent_loop = FnLoop::new(|request: LoopRequest<()>| async move {
            Ok(vec![LoopMessage::assistant(request.query)])
        });
        Agent::new(AgentConfig::new("sk-test"), (), agent_loop)
    }

    #[test]
    fn busy_guard_rejects_second_acquire_until_dropped() {
        let flag = AtomicBool::new(false);
        let guard = BusyGuard::acquire(&flag).unwrap();
        assert!(matches!(
            BusyGuard::acquire(&flag),
            Err(HelmError::InvalidState(_))
        ));
        drop(guard);
        assert!(BusyGuard::acquire(&flag).is_ok());
    }

    #[tokio::test]
    async fn execute_releases_busy_flag_and_window() {
        let agent = echo_agent();

        let text = agent.execute("hello", ExecuteOptions::default()).await.unwrap();

        assert_eq!(text, "hello");
        assert!(!agent.is_busy());
        assert_eq!(agent.bus.current_execution(), None);
    }

    #[test]
    fn report_failure_wraps_foreign_errors_as_loop_failures() {
        let agent = echo_agent();
        agent.bus.begin_execution();

        let err = agent.report_failure(HelmError::Configuration("no browser".into()));

        assert!(err.is_loop_failure());
        assert!(agent.bus.execution_progress().error_reported);
    }

    #[test]
    fn report_cancel_emits_once() {
        let agent = echo_agent();
        agent.bus.begin_execution();
        let steps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = steps.clone();
        let _sub = agent
            .controller()
            .on(move |e: &CancelEvent| sink.lock().unwrap().push(e.step));

        let err = agent.report_cancel(HelmError::Cancelled { step: 3, reason: None });
        let err = agent.report_cancel(err);

        assert!(err.is_cancelled());
        assert_eq!(*steps.lock().unwrap(), vec![3]);
    }
}
