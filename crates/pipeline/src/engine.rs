//! The workflow graph engine.
//!
//! Owns node execution order and termination:
//!
//! ```text
//!        START
//!          │ draft present?
//!    ┌─────┴─────────────────┐
//!    ▼                       ▼
//! RESEARCH ◄──── TOOL     REFLECT ◄───────┐
//!    │ tool call?  ▲         │            │
//!    ├─────────────┘         │ pass/cap   │
//!    ▼                       ▼            │
//!  WRITE ─────────────────► REFLECT ── WRITE
//!                            │
//!                            ▼
//!                           END
//! ```
//!
//! One node runs at a time; the engine merges each returned partial update
//! before routing. Nodes never see or mutate shared memory.

use async_trait::async_trait;
use scriptorium_agents::{AgentNode, ReflectorNode, ResearcherNode, WriterNode, QUALITY_TOKEN};
use scriptorium_common::{
    PipelineMessage, PipelineState, Result, ScriptoriumError, StateUpdate, ToolCall,
};
use scriptorium_llm::ModelRoles;
use scriptorium_tools::{PageFetcher, READ_URL_TOOL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// States of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Research,
    Tool,
    Write,
    Reflect,
    End,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Research => "research",
            NodeKind::Tool => "tool",
            NodeKind::Write => "write",
            NodeKind::Reflect => "reflect",
            NodeKind::End => "end",
        }
    }
}

/// Why a run reached `END`. The step-limit abort is not listed here: it
/// surfaces as [`ScriptoriumError::StepLimitExceeded`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The critique contained the quality token.
    QualityPass,
    /// The revision cap was hit before the critique passed.
    RevisionCap,
}

/// One executed step: which node ran and what it changed.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// 1-based execution index.
    pub step: usize,
    pub node: NodeKind,
    pub delta: StateUpdate,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub state: PipelineState,
    pub steps: Vec<StepRecord>,
    pub termination: Termination,
}

/// Initial pipeline input consumed at `START`.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub messages: Vec<PipelineMessage>,
    pub topic: String,
    pub draft: String,
    pub writer_style: String,
}

impl PipelineInput {
    fn into_state(self) -> PipelineState {
        let mut state = PipelineState {
            messages: self.messages,
            topic: self.topic,
            draft: self.draft,
            ..Default::default()
        };
        if !self.writer_style.is_empty() {
            state.writer_style = self.writer_style;
        }
        state
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Maximum writer re-executions before a forced stop.
    pub max_revisions: u32,
    /// Ceiling on total node executions, against runaway loops.
    pub step_limit: usize,
    /// Require the critique to equal the quality token exactly instead of
    /// merely containing it. Substring matching can stop early on
    /// super-strings ("NOT PERFECT").
    pub exact_quality_match: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_revisions: 3,
            step_limit: 50,
            exact_quality_match: false,
        }
    }
}

/// Executes tool calls requested by the researcher's model.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run_tool(&self, call: &ToolCall) -> String;
}

#[async_trait]
impl ToolRunner for PageFetcher {
    async fn run_tool(&self, call: &ToolCall) -> String {
        if call.name != READ_URL_TOOL {
            return format!("Error: unknown tool '{}'", call.name);
        }
        match call.arguments.get("url").and_then(|v| v.as_str()) {
            Some(url) => self.fetch(url).await,
            None => format!("Error: tool '{}' called without a url argument", call.name),
        }
    }
}

type Observer = Box<dyn Fn(&StepRecord) + Send + Sync>;

pub struct WorkflowEngine {
    researcher: Box<dyn AgentNode>,
    writer: Box<dyn AgentNode>,
    reflector: Box<dyn AgentNode>,
    tools: Box<dyn ToolRunner>,
    settings: EngineSettings,
    observer: Option<Observer>,
}

impl WorkflowEngine {
    /// Build the engine with the real agents and the page fetcher.
    pub fn new(roles: &ModelRoles) -> Result<Self> {
        Ok(Self::with_nodes(
            Box::new(ResearcherNode::new(roles)?),
            Box::new(WriterNode::new(roles)?),
            Box::new(ReflectorNode::new(roles)?),
            Box::new(PageFetcher::new()),
        ))
    }

    /// Assemble an engine from arbitrary nodes (used by tests).
    pub fn with_nodes(
        researcher: Box<dyn AgentNode>,
        writer: Box<dyn AgentNode>,
        reflector: Box<dyn AgentNode>,
        tools: Box<dyn ToolRunner>,
    ) -> Self {
        Self {
            researcher,
            writer,
            reflector,
            tools,
            settings: EngineSettings::default(),
            observer: None,
        }
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register a callback invoked after every merged step. Progress
    /// reporting only; routing never depends on it.
    pub fn on_step(mut self, observer: impl Fn(&StepRecord) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Drive the graph from `START` to `END`.
    pub async fn run(&self, input: PipelineInput) -> Result<RunReport> {
        let mut state = input.into_state();
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut steps_taken = 0usize;

        let review_mode = !state.draft.is_empty();
        let mut current = if review_mode {
            NodeKind::Reflect
        } else {
            NodeKind::Research
        };
        info!(
            topic = %state.topic,
            style = %state.writer_style,
            review_mode,
            entry = current.as_str(),
            "Starting editorial workflow"
        );

        loop {
            if steps_taken >= self.settings.step_limit {
                warn!(steps = steps_taken, "Aborting run: step limit reached");
                return Err(ScriptoriumError::StepLimitExceeded { steps: steps_taken });
            }
            steps_taken += 1;

            let delta = self
                .execute(current, &state)
                .await
                .map_err(|e| e.at_node(current.as_str(), steps_taken))?;
            state.apply(delta.clone());

            let record = StepRecord {
                step: steps_taken,
                node: current,
                delta,
            };
            debug!(
                step = record.step,
                node = record.node.as_str(),
                "Node execution merged"
            );
            if let Some(ref observer) = self.observer {
                observer(&record);
            }
            steps.push(record);

            match self.route(current, &state) {
                Route::Next(next) => current = next,
                Route::End(termination) => {
                    info!(
                        steps = steps_taken,
                        revisions = state.revision_count,
                        termination = ?termination,
                        "Workflow completed"
                    );
                    return Ok(RunReport {
                        state,
                        steps,
                        termination,
                    });
                }
            }
        }
    }

    async fn execute(&self, node: NodeKind, state: &PipelineState) -> Result<StateUpdate> {
        match node {
            NodeKind::Research => self.researcher.run(state).await,
            NodeKind::Write => self.writer.run(state).await,
            NodeKind::Reflect => self.reflector.run(state).await,
            NodeKind::Tool => Ok(self.run_tools(state).await),
            NodeKind::Start | NodeKind::End => unreachable!("terminal nodes are never executed"),
        }
    }

    /// Execute every tool call from the trailing assistant turn. Tool
    /// failures come back as textual payloads, so this cannot abort a run.
    async fn run_tools(&self, state: &PipelineState) -> StateUpdate {
        let calls: Vec<ToolCall> = state
            .last_message()
            .map(|msg| msg.tool_calls.clone())
            .unwrap_or_default();

        let mut update = StateUpdate::default();
        for call in &calls {
            info!(tool = %call.name, "Executing tool call");
            let output = self.tools.run_tool(call).await;
            update = update.push_message(PipelineMessage::tool_result(&call.name, output));
        }
        update
    }

    fn route(&self, node: NodeKind, state: &PipelineState) -> Route {
        match node {
            NodeKind::Research => {
                let requested = state
                    .last_message()
                    .map(PipelineMessage::requests_tool)
                    .unwrap_or(false);
                if requested {
                    Route::Next(NodeKind::Tool)
                } else {
                    Route::Next(NodeKind::Write)
                }
            }
            NodeKind::Tool => Route::Next(NodeKind::Research),
            NodeKind::Write => Route::Next(NodeKind::Reflect),
            NodeKind::Reflect => {
                if state.revision_count > self.settings.max_revisions {
                    info!("Max revisions reached, stopping");
                    Route::End(Termination::RevisionCap)
                } else if self.quality_pass(&state.critique) {
                    info!("Critique is positive, stopping");
                    Route::End(Termination::QualityPass)
                } else {
                    info!("Critique requires revision, looping back");
                    Route::Next(NodeKind::Write)
                }
            }
            NodeKind::Start | NodeKind::End => unreachable!("terminal nodes are never routed"),
        }
    }

    fn quality_pass(&self, critique: &str) -> bool {
        if self.settings.exact_quality_match {
            critique.trim() == QUALITY_TOKEN
        } else {
            // substring containment: a critique like "NOT PERFECT" also
            // satisfies this
            critique.contains(QUALITY_TOKEN)
        }
    }
}

enum Route {
    Next(NodeKind),
    End(Termination),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(settings: EngineSettings) -> WorkflowEngine {
        struct Inert;

        #[async_trait]
        impl AgentNode for Inert {
            fn name(&self) -> &'static str {
                "inert"
            }
            async fn run(&self, _state: &PipelineState) -> Result<StateUpdate> {
                Ok(StateUpdate::default())
            }
        }

        struct NoTool;

        #[async_trait]
        impl ToolRunner for NoTool {
            async fn run_tool(&self, _call: &ToolCall) -> String {
                String::new()
            }
        }

        WorkflowEngine::with_nodes(
            Box::new(Inert),
            Box::new(Inert),
            Box::new(Inert),
            Box::new(NoTool),
        )
        .settings(settings)
    }

    #[test]
    fn substring_gate_accepts_super_strings() {
        let engine = engine_with(EngineSettings::default());
        assert!(engine.quality_pass("PERFECT"));
        assert!(engine.quality_pass("PERFECT, ship it"));
        // the documented false positive of the substring gate
        assert!(engine.quality_pass("This is NOT PERFECT yet"));
        assert!(!engine.quality_pass("needs work"));
    }

    #[test]
    fn exact_gate_requires_the_bare_token() {
        let engine = engine_with(EngineSettings {
            exact_quality_match: true,
            ..Default::default()
        });
        assert!(engine.quality_pass("PERFECT"));
        assert!(engine.quality_pass("  PERFECT\n"));
        assert!(!engine.quality_pass("PERFECT, ship it"));
        assert!(!engine.quality_pass("This is NOT PERFECT yet"));
    }

    #[test]
    fn reflect_routes_by_cap_before_quality() {
        let engine = engine_with(EngineSettings::default());
        let state = PipelineState {
            revision_count: 4,
            critique: "still flawed".to_string(),
            ..Default::default()
        };
        match engine.route(NodeKind::Reflect, &state) {
            Route::End(Termination::RevisionCap) => {}
            _ => panic!("expected revision-cap stop"),
        }
    }

    #[test]
    fn reflect_loops_back_under_the_cap() {
        let engine = engine_with(EngineSettings::default());
        let state = PipelineState {
            revision_count: 2,
            critique: "fix the intro".to_string(),
            ..Default::default()
        };
        match engine.route(NodeKind::Reflect, &state) {
            Route::Next(NodeKind::Write) => {}
            _ => panic!("expected loop back to write"),
        }
    }

    #[test]
    fn research_routes_to_tool_on_pending_call() {
        let engine = engine_with(EngineSettings::default());
        let state = PipelineState {
            messages: vec![PipelineMessage::tool_request(
                "",
                vec![ToolCall {
                    name: READ_URL_TOOL.to_string(),
                    arguments: serde_json::json!({"url": "https://example.com"}),
                }],
            )],
            ..Default::default()
        };
        match engine.route(NodeKind::Research, &state) {
            Route::Next(NodeKind::Tool) => {}
            _ => panic!("expected tool transition"),
        }

        let no_call = PipelineState {
            messages: vec![PipelineMessage::assistant("facts")],
            ..Default::default()
        };
        match engine.route(NodeKind::Research, &no_call) {
            Route::Next(NodeKind::Write) => {}
            _ => panic!("expected write transition"),
        }
    }
}
