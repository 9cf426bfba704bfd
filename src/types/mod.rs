//! Core types for Helm.

pub mod execution;
pub mod message;

pub use execution::*;
pub use message::*;
