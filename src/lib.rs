//! Helm — a pausable, cancellable driver for computer-use agent loops.
//!
//! Helm wraps an external [`AgentLoop`](agent_loop::AgentLoop) (the thing
//! that talks to the model and acts on a browser page) with a caller-facing
//! [`Agent`](agent::Agent): run a task, pause/resume/cancel it from another
//! task, observe lifecycle events, and optionally get a JSON answer that is
//! extracted from free text and validated against a schema.
//!
//! # Quick Start
//!
//! ```no_run
//! use helm::prelude::*;
//!
//! # async fn example() -> helm::error::Result<()> {
//! let agent_loop = FnLoop::new(|request: LoopRequest<()>| async move {
//!     let mut gate = request.gate();
//!     gate.checkpoint().await?;
//!     gate.advance();
//!     Ok(vec![LoopMessage::assistant(r#"{"title": "Example Domain"}"#)])
//! });
//! let agent = Agent::new(AgentConfig::from_env()?, (), agent_loop);
//!
//! let schema = OutputSchema::new(serde_json::json!({
//!     "type": "object",
//!     "properties": { "title": { "type": "string" } },
//!     "required": ["title"]
//! }));
//! let value = agent
//!     .execute_value("What is the page title?", &schema, ExecuteOptions::default())
//!     .await?;
//! println!("{value}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod error;
pub mod prelude;
pub mod signals;
pub mod structured;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
