//! Error types for Scriptorium.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptoriumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model invocation failed: {0}")]
    Invocation(String),

    #[error("Step limit exceeded after {steps} node executions")]
    StepLimitExceeded { steps: usize },

    #[error("{node} node failed at step {step}: {source}")]
    NodeFailure {
        node: &'static str,
        step: usize,
        #[source]
        source: Box<ScriptoriumError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScriptoriumError {
    /// Attach the node name and step index at which a run died.
    pub fn at_node(self, node: &'static str, step: usize) -> Self {
        ScriptoriumError::NodeFailure {
            node,
            step,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScriptoriumError>;
