//! The external agent loop seam.
//!
//! Helm does not drive the browser or talk to the model itself. An
//! [`AgentLoop`] implementation does, and receives everything it needs in a
//! [`LoopRequest`], including the [`SignalBus`] it must honour.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::signals::{ExecutionGate, SignalBus};
use crate::types::{ExecutionConfig, LoopMessage};

/// Everything the loop needs for one execution.
pub struct LoopRequest<T> {
    /// Task text, already extended with schema instructions when structured
    /// output was requested.
    pub query: String,
    pub api_key: String,
    pub model: String,
    /// Automation surface (page, browser context, ...).
    pub target: Arc<T>,
    pub system_prompt_suffix: Option<String>,
    pub thinking_budget: u32,
    pub signals: Arc<SignalBus>,
    pub execution_config: ExecutionConfig,
}

impl<T> LoopRequest<T> {
    /// Attach an [`ExecutionGate`] to this request's signal bus.
    ///
    /// Call this before the first await so no control signal slips past.
    pub fn gate(&self) -> ExecutionGate {
        ExecutionGate::attach(self.signals.clone())
    }
}

impl<T> std::fmt::Debug for LoopRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopRequest")
            .field("query", &self.query)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("system_prompt_suffix", &self.system_prompt_suffix)
            .field("thinking_budget", &self.thinking_budget)
            .field("execution_config", &self.execution_config)
            .finish()
    }
}

/// The iterative model/action loop.
///
/// Must observe control signals on [`LoopRequest::signals`] (usually through
/// [`LoopRequest::gate`]), emit lifecycle events at the matching points, and
/// return the ordered conversation. Only the last message is interpreted.
#[async_trait]
pub trait AgentLoop: Send + Sync {
    type Target: Send + Sync + 'static;

    async fn run(&self, request: LoopRequest<Self::Target>) -> Result<Vec<LoopMessage>>;
}

type LoopFuture = BoxFuture<'static, Result<Vec<LoopMessage>>>;

/// [`AgentLoop`] backed by an async closure.
///
/// ```
/// use helm::agent_loop::{FnLoop, LoopRequest};
/// use helm::types::LoopMessage;
///
/// let echo = FnLoop::new(|request: LoopRequest<()>| async move {
///     Ok(vec![LoopMessage::assistant(request.query)])
/// });
/// # let _ = echo;
/// ```
pub struct FnLoop<T> {
    run: Box<dyn Fn(LoopRequest<T>) -> LoopFuture + Send + Sync>,
}

impl<T: 'static> FnLoop<T> {
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(LoopRequest<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<LoopMessage>>> + Send + 'static,
    {
        Self {
            run: Box::new(move |request: LoopRequest<T>| -> LoopFuture { Box::pin(run(request)) }),
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> AgentLoop for FnLoop<T> {
    type Target = T;

    async fn run(&self, request: LoopRequest<T>) -> Result<Vec<LoopMessage>> {
        (self.run)(request).await
    }
}
