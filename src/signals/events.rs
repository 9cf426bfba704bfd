//! Control signals and lifecycle event payloads.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::SharedError;

/// Caller → loop instruction. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ControlSignal {
    Pause,
    Resume,
    Cancel,
}

/// The loop acted on a `pause` signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PauseEvent {
    pub at: DateTime<Utc>,
    pub step: u64,
}

/// The loop acted on a `resume` signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeEvent {
    pub at: DateTime<Utc>,
    pub step: u64,
}

/// The loop stopped at a checkpoint because it was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelEvent {
    pub at: DateTime<Utc>,
    pub step: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The loop failed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub at: DateTime<Utc>,
    pub step: u64,
    #[serde(serialize_with = "serialize_error")]
    pub error: SharedError,
}

fn serialize_error<S: Serializer>(error: &SharedError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Loop → caller lifecycle notification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SignalEvent {
    #[serde(rename = "onPause")]
    Pause(PauseEvent),
    #[serde(rename = "onResume")]
    Resume(ResumeEvent),
    #[serde(rename = "onCancel")]
    Cancel(CancelEvent),
    #[serde(rename = "onError")]
    Error(ErrorEvent),
}

impl SignalEvent {
    /// Wire name of the event family (`onPause`, `onResume`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pause(_) => PauseEvent::NAME,
            Self::Resume(_) => ResumeEvent::NAME,
            Self::Cancel(_) => CancelEvent::NAME,
            Self::Error(_) => ErrorEvent::NAME,
        }
    }

    pub fn step(&self) -> u64 {
        match self {
            Self::Pause(e) => e.step,
            Self::Resume(e) => e.step,
            Self::Cancel(e) => e.step,
            Self::Error(e) => e.step,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Pause(e) => e.at,
            Self::Resume(e) => e.at,
            Self::Cancel(e) => e.at,
            Self::Error(e) => e.at,
        }
    }
}

/// A lifecycle payload type that can be subscribed to on a
/// [`SignalBus`](super::SignalBus).
///
/// Each event family is its own type, so `bus.on::<PauseEvent>(..)` hands the
/// callback a `&PauseEvent` with no runtime dispatch on the event name.
pub trait LifecycleEvent: sealed::Sealed + Send + Sync + 'static {
    /// Wire name of the event family.
    const NAME: &'static str;

    #[doc(hidden)]
    fn listeners(bus: &super::SignalBus) -> &std::sync::Arc<super::bus::Listeners<Self>>
    where
        Self: Sized;
}

impl LifecycleEvent for PauseEvent {
    const NAME: &'static str = "onPause";

    fn listeners(bus: &super::SignalBus) -> &std::sync::Arc<super::bus::Listeners<Self>> {
        &bus.on_pause
    }
}

impl LifecycleEvent for ResumeEvent {
    const NAME: &'static str = "onResume";

    fn listeners(bus: &super::SignalBus) -> &std::sync::Arc<super::bus::Listeners<Self>> {
        &bus.on_resume
    }
}

impl LifecycleEvent for CancelEvent {
    const NAME: &'static str = "onCancel";

    fn listeners(bus: &super::SignalBus) -> &std::sync::Arc<super::bus::Listeners<Self>> {
        &bus.on_cancel
    }
}

impl LifecycleEvent for ErrorEvent {
    const NAME: &'static str = "onError";

    fn listeners(bus: &super::SignalBus) -> &std::sync::Arc<super::bus::Listeners<Self>> {
        &bus.on_error
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::PauseEvent {}
    impl Sealed for super::ResumeEvent {}
    impl Sealed for super::CancelEvent {}
    impl Sealed for super::ErrorEvent {}
}
