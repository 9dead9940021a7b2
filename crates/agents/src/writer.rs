//! Writer node: produces or revises the draft.

use std::sync::Arc;

use async_trait::async_trait;
use scriptorium_common::{PipelineMessage, PipelineState, Result, StateUpdate};
use scriptorium_llm::{
    resolve_model, AgentRole, LlmClient, LlmRequest, ModelRoles, ResolveOptions,
};
use tracing::info;

use crate::node::AgentNode;
use crate::styles::style_block;

const WRITER_TEMPERATURE: f32 = 0.7;

/// Output contract appended to every style block: the blog loader expects
/// an MDX frontmatter header on each post.
const FORMAT_RULES: &str = r#"### OUTPUT FORMAT (MANDATORY)
Start the post with an MDX frontmatter header:
---
title: "<post title>"
date: "<ISO date>"
excerpt: "<one-sentence summary>"
tags: [<comma-separated tags>]
---
Then the post body in Markdown. Choose the short or long structure yourself
based on how the topic is phrased; do not ask for clarification."#;

pub struct WriterNode {
    model: Arc<dyn LlmClient>,
}

impl WriterNode {
    pub fn new(roles: &ModelRoles) -> Result<Self> {
        let model = resolve_model(
            roles,
            AgentRole::Writer,
            ResolveOptions::temperature(WRITER_TEMPERATURE),
        )?;
        Ok(Self { model })
    }

    pub fn with_model(model: Arc<dyn LlmClient>) -> Self {
        Self { model }
    }

    fn system_instruction(state: &PipelineState) -> String {
        format!(
            "{style}\n\n{FORMAT_RULES}\n\n### SOURCES\nUse this researched information (if applicable) but do NOT mention that you searched the internet:\n{research}",
            style = style_block(&state.writer_style),
            research = state.research_data,
        )
    }

    fn user_instruction(state: &PipelineState, is_revision: bool) -> String {
        if is_revision {
            format!(
                "Refine the previous post based strictly on this CRITIQUE:\n{critique}\n\n\
                 PREVIOUS POST:\n{draft}\n\n\
                 Maintain the style and fix ONLY what is necessary.",
                critique = state.critique,
                draft = state.draft,
            )
        } else {
            format!(
                "Write a post about: \"{topic}\".\n\
                 Decide yourself whether the short or the long structure fits the topic.",
                topic = state.topic,
            )
        }
    }
}

#[async_trait]
impl AgentNode for WriterNode {
    fn name(&self) -> &'static str {
        "writer"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        let is_revision = state.revision_count > 0;
        info!(
            style = %state.writer_style,
            revision = is_revision,
            iteration = state.revision_count,
            "Writer producing draft"
        );

        let response = self
            .model
            .complete(LlmRequest {
                system_prompt: Some(Self::system_instruction(state)),
                messages: vec![PipelineMessage::user(Self::user_instruction(
                    state,
                    is_revision,
                ))],
                ..Default::default()
            })
            .await?;

        let draft = response.content.clone();
        let next_count = if is_revision {
            state.revision_count + 1
        } else {
            1
        };

        Ok(StateUpdate::message(response.into_message())
            .draft(draft)
            .revision_count(next_count))
    }
}
