//! Researcher node: gathers facts for the writer, optionally via the
//! `read_url` tool.

use std::sync::Arc;

use async_trait::async_trait;
use scriptorium_common::{PipelineMessage, PipelineState, Result, StateUpdate};
use scriptorium_llm::{
    resolve_model, AgentRole, LlmClient, LlmRequest, ModelRoles, ResolveOptions,
};
use scriptorium_tools::PageFetcher;
use tracing::info;

use crate::node::AgentNode;

/// What kind of turn the researcher is reacting to. Derived from the last
/// message rather than the raw history length, so the framing decision is
/// explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    /// No history yet; the node seeds its own instruction.
    Initial,
    /// The previous turn was a tool result to digest.
    PostTool,
    /// Any other non-empty history (e.g. the caller-seeded request).
    Continuation,
}

impl TurnKind {
    fn of(state: &PipelineState) -> Self {
        match state.last_message() {
            None => TurnKind::Initial,
            Some(msg) if msg.is_tool_result() => TurnKind::PostTool,
            Some(_) => TurnKind::Continuation,
        }
    }
}

pub struct ResearcherNode {
    model: Arc<dyn LlmClient>,
}

impl ResearcherNode {
    pub fn new(roles: &ModelRoles) -> Result<Self> {
        let model = resolve_model(
            roles,
            AgentRole::Researcher,
            ResolveOptions::temperature(0.0).with_tools(vec![PageFetcher::tool_spec()]),
        )?;
        Ok(Self { model })
    }

    /// Build the node around an arbitrary handle (used by tests).
    pub fn with_model(model: Arc<dyn LlmClient>) -> Self {
        Self { model }
    }

    fn research_instruction(topic: &str) -> String {
        format!(
            "You are an expert researcher.\n\
             The user wants a post about: \"{topic}\".\n\n\
             If the user provided a URL in the message history, USE THE 'read_url' TOOL to read it.\n\
             If no URL is provided, rely on your internal knowledge to gather key facts.\n\n\
             Focus on:\n\
             1. Key statistics.\n\
             2. Novel ideas.\n\
             3. Technical accuracy."
        )
    }
}

#[async_trait]
impl AgentNode for ResearcherNode {
    fn name(&self) -> &'static str {
        "researcher"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        let turn = TurnKind::of(state);
        info!(
            topic = %state.topic,
            turn = ?turn,
            history_len = state.messages.len(),
            "Researcher analyzing request"
        );

        // Seed the instruction only on a truly empty history. Otherwise the
        // accumulated log is passed as-is and the model reacts to the latest
        // turn, including a trailing tool result.
        let messages = match turn {
            TurnKind::Initial => vec![PipelineMessage::user(Self::research_instruction(
                &state.topic,
            ))],
            TurnKind::PostTool | TurnKind::Continuation => state.messages.clone(),
        };

        let response = self
            .model
            .complete(LlmRequest {
                messages,
                ..Default::default()
            })
            .await?;

        if !response.tool_calls.is_empty() {
            // Returning only the message routes the graph to the tool node.
            return Ok(StateUpdate::message(response.into_message()));
        }

        let research_data = response.content.clone();
        Ok(StateUpdate::message(response.into_message()).research_data(research_data))
    }
}
