//! Shared test helpers and a scripted agent loop.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use helm::agent::Agent;
use helm::agent_loop::{AgentLoop, LoopRequest};
use helm::config::AgentConfig;
use helm::error::{HelmError, Result};
use helm::types::{ExecutionConfig, LoopMessage};

/// How a scripted run ends once its steps are done.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Return these messages.
    Messages(Vec<LoopMessage>),
    /// Fail through the gate, which emits `onError`.
    Fail(String),
    /// Fail without emitting anything.
    FailSilently(String),
}

/// What the loop was handed for one execution.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub query: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt_suffix: Option<String>,
    pub thinking_budget: u32,
    pub execution_config: ExecutionConfig,
}

/// An agent loop that runs a fixed number of gated steps, then ends with a
/// canned outcome.
pub struct ScriptedLoop {
    steps: u64,
    step_delay: Duration,
    outcome: Outcome,
    progress: watch::Sender<u64>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedLoop {
    pub fn new(steps: u64) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            steps,
            step_delay: Duration::from_millis(10),
            outcome: Outcome::Messages(vec![LoopMessage::assistant("done")]),
            progress,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Finish with a single assistant message.
    pub fn respond(self, text: &str) -> Self {
        self.outcome(Outcome::Messages(vec![
            LoopMessage::user("task"),
            LoopMessage::assistant(text),
        ]))
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Watch the step the loop most recently started.
    pub fn progress(&self) -> watch::Receiver<u64> {
        self.progress.subscribe()
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl AgentLoop for ScriptedLoop {
    type Target = ();

    async fn run(&self, request: LoopRequest<()>) -> Result<Vec<LoopMessage>> {
        let mut gate = request.gate();
        self.requests.lock().unwrap().push(RecordedRequest {
            query: request.query.clone(),
            api_key: request.api_key.clone(),
            model: request.model.clone(),
            system_prompt_suffix: request.system_prompt_suffix.clone(),
            thinking_budget: request.thinking_budget,
            execution_config: request.execution_config.clone(),
        });
        self.progress.send_replace(0);

        while gate.step() < self.steps {
            gate.checkpoint().await?;
            let step = gate.advance();
            self.progress.send_replace(step);
            tokio::time::sleep(self.step_delay).await;
        }
        gate.checkpoint().await?;

        match &self.outcome {
            Outcome::Messages(messages) => Ok(messages.clone()),
            Outcome::Fail(message) => Err(gate.fail(message.clone())),
            Outcome::FailSilently(message) => Err(HelmError::loop_failure(message.clone())),
        }
    }
}

pub fn agent(agent_loop: ScriptedLoop) -> Agent<ScriptedLoop> {
    Agent::new(AgentConfig::new("sk-test"), (), agent_loop)
}

/// Every lifecycle event as `(name, step)`, in arrival order.
pub type EventLog = Arc<Mutex<Vec<(&'static str, u64)>>>;

/// Record all four lifecycle families into one log. Dropped subscriptions
/// stay registered, so the handles are discarded.
pub fn record_events<L: AgentLoop>(agent: &Agent<L>) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let controller = agent.controller();

    let sink = log.clone();
    let _ = controller.on(move |e: &helm::signals::PauseEvent| {
        sink.lock().unwrap().push(("onPause", e.step));
    });
    let sink = log.clone();
    let _ = controller.on(move |e: &helm::signals::ResumeEvent| {
        sink.lock().unwrap().push(("onResume", e.step));
    });
    let sink = log.clone();
    let _ = controller.on(move |e: &helm::signals::CancelEvent| {
        sink.lock().unwrap().push(("onCancel", e.step));
    });
    let sink = log.clone();
    let _ = controller.on(move |e: &helm::signals::ErrorEvent| {
        sink.lock().unwrap().push(("onError", e.step));
    });
    log
}

pub fn event_names(log: &EventLog) -> Vec<&'static str> {
    log.lock().unwrap().iter().map(|(name, _)| *name).collect()
}
