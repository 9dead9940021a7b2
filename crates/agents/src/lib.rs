//! The three editorial agents.
//!
//! Each agent is an [`AgentNode`]: it receives a read-only snapshot of the
//! pipeline state and returns a partial update. The workflow engine in
//! `scriptorium-pipeline` owns sequencing and merging.
//!
//! - **Researcher**: gathers facts, optionally via the `read_url` tool
//! - **Writer**: produces or revises the draft in the selected style
//! - **Reflector**: critiques the draft and emits the quality verdict

pub mod node;
pub mod reflector;
pub mod researcher;
pub mod styles;
pub mod writer;

pub use node::AgentNode;
pub use reflector::{ReflectorNode, QUALITY_TOKEN};
pub use researcher::ResearcherNode;
pub use styles::{known_styles, style_block};
pub use writer::WriterNode;
