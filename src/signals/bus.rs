//! In-process signal bus shared between a caller and a running loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use uuid::Uuid;

use super::events::{
    CancelEvent, ControlSignal, ErrorEvent, LifecycleEvent, PauseEvent, ResumeEvent, SignalEvent,
};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifier of one execution window on a bus.
pub type ExecutionId = Uuid;

/// Registered callbacks for a single event family, in registration order.
pub struct Listeners<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback<E>)>>,
}

impl<E> Listeners<E> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, callback: Callback<E>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.entries).push((id, callback));
        id
    }

    fn dispatch(&self, payload: &E) -> usize {
        // Snapshot first: callbacks may (un)subscribe while we iterate.
        let callbacks: Vec<Callback<E>> =
            lock(&self.entries).iter().map(|(_, cb)| cb.clone()).collect();
        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

trait Deregister: Send + Sync {
    fn remove(&self, id: u64) -> bool;
}

impl<E: 'static> Deregister for Listeners<E> {
    fn remove(&self, id: u64) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }
}

/// Handle returned by every registration; removes exactly that registration.
///
/// Dropping the handle leaves the listener registered.
pub struct Subscription {
    listeners: Weak<dyn Deregister>,
    id: u64,
    event: &'static str,
}

impl Subscription {
    /// Deregister the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.listeners.upgrade() {
            Some(listeners) => listeners.remove(self.id),
            None => false,
        }
    }

    /// Event family this subscription belongs to.
    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

#[derive(Default)]
struct ExecutionWindow {
    id: Option<ExecutionId>,
    pending: Vec<ControlSignal>,
    last_step: u64,
    error_reported: bool,
    cancel_reported: bool,
}

/// Publish/subscribe channel with two disjoint families:
/// control signals (caller → loop) and lifecycle events (loop → caller).
///
/// Delivery is synchronous and in registration order. A control signal sent
/// while an execution window is open but nobody is listening yet is buffered
/// (latest per kind) and handed to the first control subscriber; outside a
/// window it is dropped.
pub struct SignalBus {
    control: Arc<Listeners<ControlSignal>>,
    pub(crate) on_pause: Arc<Listeners<PauseEvent>>,
    pub(crate) on_resume: Arc<Listeners<ResumeEvent>>,
    pub(crate) on_cancel: Arc<Listeners<CancelEvent>>,
    pub(crate) on_error: Arc<Listeners<ErrorEvent>>,
    window: Mutex<ExecutionWindow>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("control", &self.control.len())
            .field("on_pause", &self.on_pause.len())
            .field("on_resume", &self.on_resume.len())
            .field("on_cancel", &self.on_cancel.len())
            .field("on_error", &self.on_error.len())
            .field("execution", &self.current_execution())
            .finish()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            control: Arc::new(Listeners::new()),
            on_pause: Arc::new(Listeners::new()),
            on_resume: Arc::new(Listeners::new()),
            on_cancel: Arc::new(Listeners::new()),
            on_error: Arc::new(Listeners::new()),
            window: Mutex::new(ExecutionWindow::default()),
        }
    }

    /// Dispatch a control signal to every control subscriber. Never blocks.
    pub fn send(&self, signal: ControlSignal) {
        // Hold the window lock across the subscriber check so a concurrent
        // `subscribe_control` cannot slip between "nobody listening" and
        // "buffered".
        let mut window = lock(&self.window);
        if self.control.len() > 0 {
            drop(window);
            let delivered = self.control.dispatch(&signal);
            tracing::debug!(%signal, delivered, "control signal dispatched");
            return;
        }
        match window.id {
            Some(execution_id) => {
                window.pending.retain(|pending| *pending != signal);
                window.pending.push(signal);
                tracing::debug!(%execution_id, %signal, "control signal buffered until loop subscribes");
            }
            None => {
                tracing::debug!(%signal, "control signal ignored: no execution in progress");
            }
        }
    }

    /// Register a control-signal subscriber. Signals buffered for the current
    /// execution window are replayed to it immediately, in arrival order.
    pub fn subscribe_control<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ControlSignal) + Send + Sync + 'static,
    {
        let callback: Callback<ControlSignal> = Arc::new(move |signal: &ControlSignal| callback(*signal));
        let mut window = lock(&self.window);
        let pending = std::mem::take(&mut window.pending);
        let id = self.control.add(callback.clone());
        drop(window);
        for signal in &pending {
            tracing::debug!(%signal, "replaying buffered control signal");
            callback(signal);
        }
        let listeners: Arc<dyn Deregister> = self.control.clone();
        Subscription {
            listeners: Arc::downgrade(&listeners),
            id,
            event: "control",
        }
    }

    /// Register a listener for one lifecycle event family.
    pub fn on<E, F>(&self, callback: F) -> Subscription
    where
        E: LifecycleEvent,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let listeners = E::listeners(self);
        let id = listeners.add(Arc::new(callback));
        let erased: Arc<dyn Deregister> = listeners.clone();
        Subscription {
            listeners: Arc::downgrade(&erased),
            id,
            event: E::NAME,
        }
    }

    /// Deliver a lifecycle event to the listeners of its family.
    pub fn emit(&self, event: SignalEvent) {
        {
            let mut window = lock(&self.window);
            window.last_step = window.last_step.max(event.step());
            match &event {
                SignalEvent::Error(_) => window.error_reported = true,
                SignalEvent::Cancel(_) => window.cancel_reported = true,
                _ => {}
            }
        }
        let name = event.name();
        let step = event.step();
        let delivered = match &event {
            SignalEvent::Pause(payload) => self.on_pause.dispatch(payload),
            SignalEvent::Resume(payload) => self.on_resume.dispatch(payload),
            SignalEvent::Cancel(payload) => self.on_cancel.dispatch(payload),
            SignalEvent::Error(payload) => self.on_error.dispatch(payload),
        };
        tracing::debug!(event = name, step, delivered, "lifecycle event emitted");
    }

    /// Number of registered control subscribers.
    pub fn control_subscribers(&self) -> usize {
        self.control.len()
    }

    /// Identifier of the open execution window, if any.
    pub fn current_execution(&self) -> Option<ExecutionId> {
        lock(&self.window).id
    }

    /// Open a new execution window, discarding any state from the last one.
    pub(crate) fn begin_execution(&self) -> ExecutionId {
        let id = Uuid::new_v4();
        *lock(&self.window) = ExecutionWindow {
            id: Some(id),
            ..ExecutionWindow::default()
        };
        id
    }

    /// Note that the loop started `step`, so events the facade emits on the
    /// loop's behalf carry it.
    pub(crate) fn record_step(&self, step: u64) {
        let mut window = lock(&self.window);
        window.last_step = window.last_step.max(step);
    }

    /// Close the execution window. Returns the final bookkeeping.
    pub(crate) fn end_execution(&self) -> WindowProgress {
        let mut window = lock(&self.window);
        let summary = WindowProgress::of(&window);
        *window = ExecutionWindow::default();
        summary
    }

    /// Step and event bookkeeping of the open window.
    pub(crate) fn execution_progress(&self) -> WindowProgress {
        WindowProgress::of(&lock(&self.window))
    }
}

/// What the open execution window has seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowProgress {
    pub last_step: u64,
    pub error_reported: bool,
    pub cancel_reported: bool,
}

impl WindowProgress {
    fn of(window: &ExecutionWindow) -> Self {
        Self {
            last_step: window.last_step,
            error_reported: window.error_reported,
            cancel_reported: window.cancel_reported,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn pause(step: u64) -> SignalEvent {
        SignalEvent::Pause(PauseEvent { at: Utc::now(), step })
    }

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<T>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (log.clone(), log)
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = SignalBus::new();
        let (log, seen) = recorder::<&'static str>();
        let first = log.clone();
        let _a = bus.on::<PauseEvent, _>(move |_| first.lock().unwrap().push("first"));
        let second = log.clone();
        let _b = bus.on::<PauseEvent, _>(move |_| second.lock().unwrap().push("second"));

        bus.emit(pause(1));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let bus = SignalBus::new();
        let (log, seen) = recorder::<&'static str>();
        let a_log = log.clone();
        let a = bus.on::<PauseEvent, _>(move |_| a_log.lock().unwrap().push("a"));
        let b_log = log.clone();
        let _b = bus.on::<PauseEvent, _>(move |_| b_log.lock().unwrap().push("b"));

        assert!(a.unsubscribe());
        bus.emit(pause(1));

        assert_eq!(*seen.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn unsubscribe_twice_reports_false() {
        let bus = SignalBus::new();
        let sub = bus.on::<ResumeEvent, _>(|_| {});
        let id = sub.id;
        assert!(sub.unsubscribe());
        let stale = Subscription {
            listeners: {
                let erased: Arc<dyn Deregister> = bus.on_resume.clone();
                Arc::downgrade(&erased)
            },
            id,
            event: ResumeEvent::NAME,
        };
        assert!(!stale.unsubscribe());
    }

    #[test]
    fn event_families_are_disjoint() {
        let bus = SignalBus::new();
        let (log, seen) = recorder::<&'static str>();
        let on_resume = log.clone();
        let _r = bus.on::<ResumeEvent, _>(move |_| on_resume.lock().unwrap().push("resume"));

        bus.emit(pause(1));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_dispatch() {
        let bus = Arc::new(SignalBus::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let inner_slot = slot.clone();
        let inner_calls = calls.clone();
        let sub = bus.on::<PauseEvent, _>(move |_| {
            inner_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = inner_slot.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        bus.emit(pause(1));
        bus.emit(pause(2));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn control_signal_without_window_or_subscriber_is_dropped() {
        let bus = SignalBus::new();
        bus.send(ControlSignal::Cancel);

        let (log, seen) = recorder::<ControlSignal>();
        let _sub = bus.subscribe_control(move |signal| log.lock().unwrap().push(signal));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn control_signals_buffer_latest_per_kind_inside_window() {
        let bus = SignalBus::new();
        bus.begin_execution();
        bus.send(ControlSignal::Pause);
        bus.send(ControlSignal::Resume);
        bus.send(ControlSignal::Pause);

        let (log, seen) = recorder::<ControlSignal>();
        let _sub = bus.subscribe_control(move |signal| log.lock().unwrap().push(signal));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ControlSignal::Resume, ControlSignal::Pause]
        );
    }

    #[test]
    fn closing_window_discards_buffered_signals() {
        let bus = SignalBus::new();
        bus.begin_execution();
        bus.send(ControlSignal::Cancel);
        bus.end_execution();
        bus.begin_execution();

        let (log, seen) = recorder::<ControlSignal>();
        let _sub = bus.subscribe_control(move |signal| log.lock().unwrap().push(signal));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn window_tracks_last_step_and_error_reporting() {
        let bus = SignalBus::new();
        bus.begin_execution();
        bus.emit(pause(4));
        let progress = bus.execution_progress();
        assert_eq!((progress.last_step, progress.error_reported), (4, false));

        bus.emit(SignalEvent::Error(ErrorEvent {
            at: Utc::now(),
            step: 5,
            error: Arc::new(std::fmt::Error),
        }));

        let summary = bus.end_execution();
        assert_eq!(
            summary,
            WindowProgress {
                last_step: 5,
                error_reported: true,
                cancel_reported: false,
            }
        );
        assert_eq!(bus.current_execution(), None);
    }

    #[test]
    fn recorded_steps_advance_without_events() {
        let bus = SignalBus::new();
        bus.begin_execution();
        bus.record_step(3);
        bus.record_step(2);

        assert_eq!(bus.execution_progress().last_step, 3);
        assert_eq!(bus.end_execution().last_step, 3);
        assert_eq!(bus.execution_progress().last_step, 0);
    }

    #[test]
    fn window_tracks_cancel_reporting() {
        let bus = SignalBus::new();
        bus.begin_execution();
        assert!(!bus.execution_progress().cancel_reported);

        bus.emit(SignalEvent::Cancel(CancelEvent {
            at: Utc::now(),
            step: 1,
            reason: None,
        }));

        assert!(bus.execution_progress().cancel_reported);
    }
}
