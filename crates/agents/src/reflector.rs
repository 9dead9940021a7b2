//! Reflector node: critiques the draft against the style contract.

use std::sync::Arc;

use async_trait::async_trait;
use scriptorium_common::{PipelineMessage, PipelineState, Result, StateUpdate};
use scriptorium_llm::{
    resolve_model, AgentRole, LlmClient, LlmRequest, ModelRoles, ResolveOptions,
};
use tracing::info;

use crate::node::AgentNode;
use crate::styles::style_block;

/// Verdict the reflector must emit when the draft passes every rule.
pub const QUALITY_TOKEN: &str = "PERFECT";

pub struct ReflectorNode {
    model: Arc<dyn LlmClient>,
}

impl ReflectorNode {
    pub fn new(roles: &ModelRoles) -> Result<Self> {
        let model = resolve_model(
            roles,
            AgentRole::Reflector,
            ResolveOptions::temperature(0.0),
        )?;
        Ok(Self { model })
    }

    pub fn with_model(model: Arc<dyn LlmClient>) -> Self {
        Self { model }
    }

    fn system_instruction(state: &PipelineState) -> String {
        format!(
            "You are the strictest **Chief Editor** in the tech world.\n\
             Your job is to ensure posts follow these style rules exactly:\n\n\
             {style}\n\n\
             ### CHECKS TO RUN\n\
             1. **Zero Fluff**: Does it start with greetings or vague intros? (Must be removed.)\n\
             2. **Structure**: Does it follow the structure the style demands for its length?\n\
             3. **Format**: Is the MDX frontmatter header present and complete?\n\
             4. **Accuracy**: Does every claim match the research notes below?\n\n\
             If the draft meets all criteria and is excellent: respond only \"{QUALITY_TOKEN}\".\n\
             If it fails at something: list specific errors for the writer to fix. Be direct and harsh.",
            style = style_block(&state.writer_style),
        )
    }

    fn user_instruction(state: &PipelineState) -> String {
        format!(
            "Critique this draft about \"{topic}\":\n\n{draft}\n\n\
             Research info (to verify accuracy):\n{research}",
            topic = state.topic,
            draft = state.draft,
            research = state.research_data,
        )
    }
}

#[async_trait]
impl AgentNode for ReflectorNode {
    fn name(&self) -> &'static str {
        "reflector"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        info!(
            style = %state.writer_style,
            draft_len = state.draft.len(),
            "Reflector critiquing draft"
        );

        let response = self
            .model
            .complete(LlmRequest {
                system_prompt: Some(Self::system_instruction(state)),
                messages: vec![PipelineMessage::user(Self::user_instruction(state))],
                ..Default::default()
            })
            .await?;

        let critique = response.content.clone();
        Ok(StateUpdate::message(response.into_message()).critique(critique))
    }
}
