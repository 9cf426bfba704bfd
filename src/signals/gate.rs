//! Loop-side view of the signal bus.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{HelmError, Result};

use super::bus::{SignalBus, Subscription};
use super::events::{CancelEvent, ControlSignal, ErrorEvent, PauseEvent, ResumeEvent, SignalEvent};

/// Turns control signals into safe-checkpoint semantics for an agent loop.
///
/// Attach it before doing any work, call [`checkpoint`](Self::checkpoint)
/// between discrete steps and [`advance`](Self::advance) at the start of each
/// step. The gate owns the step counter and emits lifecycle events with it.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use helm::signals::{ExecutionGate, SignalBus};
/// # async fn run(bus: Arc<SignalBus>) -> helm::error::Result<()> {
/// let mut gate = ExecutionGate::attach(bus);
/// loop {
///     gate.checkpoint().await?;
///     let step = gate.advance();
///     // ... perform one action ...
///     # if step > 3 { break; }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ExecutionGate {
    bus: Arc<SignalBus>,
    signals: mpsc::UnboundedReceiver<ControlSignal>,
    subscription: Option<Subscription>,
    token: CancellationToken,
    step: u64,
    paused: bool,
    cancelled: Option<Option<String>>,
}

impl ExecutionGate {
    /// Subscribe to control signals on `bus`. Signals buffered by the bus for
    /// the current execution are picked up immediately.
    pub fn attach(bus: Arc<SignalBus>) -> Self {
        let (tx, signals) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let on_cancel = token.clone();
        let subscription = bus.subscribe_control(move |signal| {
            if signal == ControlSignal::Cancel {
                on_cancel.cancel();
            }
            let _ = tx.send(signal);
        });
        Self {
            bus,
            signals,
            subscription: Some(subscription),
            token,
            step: 0,
            paused: false,
            cancelled: None,
        }
    }

    /// Current step counter.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Start the next step and return its number.
    pub fn advance(&mut self) -> u64 {
        self.step += 1;
        self.bus.record_step(self.step);
        self.step
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Token that fires as soon as `cancel` is sent, before the next
    /// checkpoint. Select on it around long awaits inside a step.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Apply pending control signals.
    ///
    /// Returns immediately when running. While paused, waits until `resume`
    /// or `cancel` arrives. A `cancel` emits `onCancel` and yields
    /// [`HelmError::Cancelled`], including on every later call.
    pub async fn checkpoint(&mut self) -> Result<()> {
        if let Some(reason) = &self.cancelled {
            return Err(HelmError::Cancelled {
                step: self.step,
                reason: reason.clone(),
            });
        }
        loop {
            while let Ok(signal) = self.signals.try_recv() {
                self.apply(signal)?;
            }
            if !self.paused {
                return Ok(());
            }
            match self.signals.recv().await {
                Some(signal) => self.apply(signal)?,
                None => return Err(self.cancel_with(Some("signal channel closed".into()))),
            }
        }
    }

    /// Cancel from inside the loop (step budget exhausted, target closed, ...).
    pub fn cancel(&mut self, reason: impl Into<String>) -> HelmError {
        self.cancel_with(Some(reason.into()))
    }

    /// Report a loop failure: emits `onError` and returns the error to
    /// propagate out of the loop.
    pub fn fail(&self, error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> HelmError {
        let error: crate::error::SharedError = Arc::from(error.into());
        tracing::warn!(step = self.step, error = %error, "agent loop failed");
        self.bus.emit(SignalEvent::Error(ErrorEvent {
            at: Utc::now(),
            step: self.step,
            error: error.clone(),
        }));
        HelmError::Loop(error)
    }

    fn apply(&mut self, signal: ControlSignal) -> Result<()> {
        match signal {
            ControlSignal::Pause if !self.paused => {
                self.paused = true;
                tracing::info!(step = self.step, "execution paused");
                self.bus.emit(SignalEvent::Pause(PauseEvent {
                    at: Utc::now(),
                    step: self.step,
                }));
            }
            ControlSignal::Resume if self.paused => {
                self.paused = false;
                tracing::info!(step = self.step, "execution resumed");
                self.bus.emit(SignalEvent::Resume(ResumeEvent {
                    at: Utc::now(),
                    step: self.step,
                }));
            }
            ControlSignal::Cancel => return Err(self.cancel_with(None)),
            redundant => {
                tracing::debug!(signal = %redundant, paused = self.paused, "redundant control signal ignored");
            }
        }
        Ok(())
    }

    fn cancel_with(&mut self, reason: Option<String>) -> HelmError {
        if self.cancelled.is_none() {
            self.paused = false;
            self.token.cancel();
            tracing::info!(step = self.step, reason = ?reason, "execution cancelled");
            self.bus.emit(SignalEvent::Cancel(CancelEvent {
                at: Utc::now(),
                step: self.step,
                reason: reason.clone(),
            }));
            self.cancelled = Some(reason);
        }
        HelmError::Cancelled {
            step: self.step,
            reason: self.cancelled.clone().flatten(),
        }
    }
}

impl Drop for ExecutionGate {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl std::fmt::Debug for ExecutionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionGate")
            .field("step", &self.step)
            .field("paused", &self.paused)
            .field("cancelled", &self.cancelled.is_some())
            .finish()
    }
}
