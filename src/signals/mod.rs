//! Control signals (caller → loop) and lifecycle events (loop → caller).

pub mod bus;
pub mod events;
pub mod gate;

pub use bus::{ExecutionId, SignalBus, Subscription};
pub use events::*;
pub use gate::ExecutionGate;
