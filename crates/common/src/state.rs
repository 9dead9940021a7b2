//! The shared pipeline state and its merge rules.
//!
//! One `PipelineState` exists per run, owned exclusively by the workflow
//! engine. Nodes receive a read-only snapshot and hand back a
//! [`StateUpdate`]; the engine merges it with [`PipelineState::apply`].
//! The message log concatenates, every scalar field is last-write-wins
//! when the update carries a value.

use serde::{Deserialize, Serialize};

use crate::message::PipelineMessage;

/// Style key used when the requested one is absent or unknown.
pub const DEFAULT_STYLE_KEY: &str = "web-dev";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Append-only log; insertion order is causal order.
    pub messages: Vec<PipelineMessage>,
    pub topic: String,
    pub research_data: String,
    pub draft: String,
    pub critique: String,
    /// Count of writer executions so far.
    pub revision_count: u32,
    pub writer_style: String,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            topic: String::new(),
            research_data: String::new(),
            draft: String::new(),
            critique: String::new(),
            revision_count: 0,
            writer_style: DEFAULT_STYLE_KEY.to_string(),
        }
    }
}

impl PipelineState {
    pub fn last_message(&self) -> Option<&PipelineMessage> {
        self.messages.last()
    }

    /// Merge a node's partial update into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(topic) = update.topic {
            self.topic = topic;
        }
        if let Some(research_data) = update.research_data {
            self.research_data = research_data;
        }
        if let Some(draft) = update.draft {
            self.draft = draft;
        }
        if let Some(critique) = update.critique {
            self.critique = critique;
        }
        if let Some(revision_count) = update.revision_count {
            self.revision_count = revision_count;
        }
        if let Some(writer_style) = update.writer_style {
            self.writer_style = writer_style;
        }
    }
}

/// A partial update returned by one node execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Appended onto the existing log, never replacing it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<PipelineMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_style: Option<String>,
}

impl StateUpdate {
    pub fn message(msg: PipelineMessage) -> Self {
        Self {
            messages: vec![msg],
            ..Default::default()
        }
    }

    pub fn push_message(mut self, msg: PipelineMessage) -> Self {
        self.messages.push(msg);
        self
    }

    pub fn research_data(mut self, value: impl Into<String>) -> Self {
        self.research_data = Some(value.into());
        self
    }

    pub fn draft(mut self, value: impl Into<String>) -> Self {
        self.draft = Some(value.into());
        self
    }

    pub fn critique(mut self, value: impl Into<String>) -> Self {
        self.critique = Some(value.into());
        self
    }

    pub fn revision_count(mut self, value: u32) -> Self {
        self.revision_count = Some(value);
        self
    }
}
