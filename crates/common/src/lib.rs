//! Common types shared across Scriptorium crates.
//!
//! This crate provides the error taxonomy, the message records, and the
//! pipeline state that every other crate in the workspace builds on.

pub mod error;
pub mod message;
pub mod state;

pub use error::{Result, ScriptoriumError};
pub use message::{MessageRole, PipelineMessage, ToolCall};
pub use state::{PipelineState, StateUpdate, DEFAULT_STYLE_KEY};
