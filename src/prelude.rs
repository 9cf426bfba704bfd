//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentController, ExecuteOptions};
pub use crate::agent_loop::{AgentLoop, FnLoop, LoopRequest};
pub use crate::config::AgentConfig;
pub use crate::error::{HelmError, Result};
pub use crate::signals::{
    CancelEvent, ControlSignal, ErrorEvent, ExecutionGate, PauseEvent, ResumeEvent, SignalBus,
    SignalEvent, Subscription,
};
pub use crate::structured::{extract_json, OutputSchema, StructuredQuery};
pub use crate::types::{ContentBlock, ExecutionConfig, LoopMessage, MessageContent, Role};
