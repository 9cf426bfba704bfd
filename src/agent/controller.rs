//! Caller-facing control surface for a running agent.

use std::sync::Arc;

use crate::signals::{ControlSignal, LifecycleEvent, SignalBus, Subscription};

/// Sends control signals to, and observes lifecycle events from, the loop
/// driven by an [`Agent`](super::Agent).
///
/// Cheap to clone; hand a clone to a UI task to pause or cancel while
/// `execute` is awaiting.
///
/// ```no_run
/// use helm::agent::AgentController;
/// use helm::signals::{ControlSignal, PauseEvent};
///
/// fn wire(controller: &AgentController) {
///     let sub = controller.on(|event: &PauseEvent| println!("paused at step {}", event.step));
///     controller.signal(ControlSignal::Pause);
///     sub.unsubscribe();
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AgentController {
    bus: Arc<SignalBus>,
}

impl AgentController {
    pub(crate) fn new(bus: Arc<SignalBus>) -> Self {
        Self { bus }
    }

    /// Send a control signal. A no-op when nothing is running.
    pub fn signal(&self, signal: ControlSignal) {
        tracing::debug!(%signal, "controller signal");
        self.bus.send(signal);
    }

    pub fn pause(&self) {
        self.signal(ControlSignal::Pause);
    }

    pub fn resume(&self) {
        self.signal(ControlSignal::Resume);
    }

    pub fn cancel(&self) {
        self.signal(ControlSignal::Cancel);
    }

    /// Subscribe to one lifecycle event family, chosen by the callback's
    /// payload type (`PauseEvent`, `ResumeEvent`, `CancelEvent`, `ErrorEvent`).
    pub fn on<E, F>(&self, callback: F) -> Subscription
    where
        E: LifecycleEvent,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.bus.on::<E, F>(callback)
    }
}
