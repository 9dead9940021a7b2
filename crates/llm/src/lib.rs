pub mod client;
pub mod config;
pub mod fallback;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use client::{LlmClient, LlmRequest, LlmResponse, TokenUsage, ToolSpec};
pub use config::{
    resolve_model, AgentRole, BoundClient, EnvVars, ModelRoles, Provider, ResolveOptions,
    RoleModelConfig, FALLBACK_MODEL,
};
pub use fallback::{FallbackClient, FALLBACK_ATTEMPTS};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;
