//! Agent facade and its controller.

#[allow(clippy::module_inception)]
pub mod agent;
pub mod controller;

pub use agent::{Agent, ExecuteOptions, DEFAULT_THINKING_BUDGET};
pub use controller::AgentController;
