//! Workflow orchestration for the editorial pipeline.
//!
//! The engine sequences the researcher, writer, and reflector nodes over a
//! single shared [`scriptorium_common::PipelineState`], executes tool
//! round-trips on the researcher's behalf, and terminates on a quality
//! pass, the revision cap, or the global step limit.

pub mod engine;

pub use engine::{
    EngineSettings, NodeKind, PipelineInput, RunReport, StepRecord, Termination, ToolRunner,
    WorkflowEngine,
};
