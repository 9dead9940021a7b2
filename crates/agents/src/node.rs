//! The core node abstraction the workflow engine drives.

use async_trait::async_trait;
use scriptorium_common::{PipelineState, Result, StateUpdate};

/// One agent's unit of work: a pure function from a state snapshot to a
/// partial state update. Nodes never mutate the state they receive.
#[async_trait]
pub trait AgentNode: Send + Sync {
    /// Stable node name, used in step reporting and error context.
    fn name(&self) -> &'static str;

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate>;
}
