use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use scriptorium_common::{Result, ScriptoriumError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{LlmClient, LlmRequest, LlmResponse, ToolSpec};
use crate::fallback::FallbackClient;
use crate::gemini::GeminiClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiCompatibleClient;

/// Model used as the secondary in every fallback chain.
pub const FALLBACK_MODEL: &str = "gemini-3-pro-preview";

const DEFAULT_MODEL_SPEC: &str = "gemini:gemini-3-pro-preview";
const DEFAULT_OPENAI_COMPATIBLE_KEY: &str = "ollama";

/// The three agent roles the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Researcher,
    Writer,
    Reflector,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Researcher => "researcher",
            AgentRole::Writer => "writer",
            AgentRole::Reflector => "reflector",
        }
    }
}

/// Closed set of supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Gemini,
    OpenaiCompatible,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenaiCompatible => "openai_compatible",
            Provider::Ollama => "ollama",
        }
    }
}

impl FromStr for Provider {
    type Err = ScriptoriumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gemini" => Ok(Provider::Gemini),
            "openai_compatible" => Ok(Provider::OpenaiCompatible),
            "ollama" => Ok(Provider::Ollama),
            other => Err(ScriptoriumError::Config(format!(
                "Unknown model provider: {other}"
            ))),
        }
    }
}

/// Parse a `provider:model` spec string, splitting on the first colon so
/// model names may themselves contain colons (`ollama:llama3.2:3b`).
pub fn parse_model_spec(spec: &str) -> Result<(Provider, String)> {
    let (provider_raw, model) = spec.split_once(':').ok_or_else(|| {
        ScriptoriumError::Config(format!("Malformed model spec '{spec}': expected provider:model"))
    })?;
    if model.is_empty() {
        return Err(ScriptoriumError::Config(format!(
            "Malformed model spec '{spec}': empty model name"
        )));
    }
    Ok((provider_raw.parse()?, model.to_string()))
}

/// Resolved configuration for one agent role.
#[derive(Debug, Clone)]
pub struct RoleModelConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Raw environment values feeding [`ModelRoles`]; split out so tests can
/// construct configurations without touching process-wide state.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    pub google_api_key: Option<String>,
    pub openai_compatible_base_url: Option<String>,
    pub openai_compatible_api_key: Option<String>,
    pub researcher_model: Option<String>,
    pub writer_model: Option<String>,
    pub reflector_model: Option<String>,
}

impl EnvVars {
    pub fn capture() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            google_api_key: var("GOOGLE_API_KEY"),
            openai_compatible_base_url: var("OPENAI_COMPATIBLE_BASE_URL"),
            openai_compatible_api_key: var("OPENAI_COMPATIBLE_API_KEY"),
            researcher_model: var("RESEARCHER_MODEL"),
            writer_model: var("WRITER_MODEL"),
            reflector_model: var("REFLECTOR_MODEL"),
        }
    }
}

/// Immutable per-role model configuration, built once at process start.
#[derive(Debug, Clone)]
pub struct ModelRoles {
    google_api_key: String,
    researcher: RoleModelConfig,
    writer: RoleModelConfig,
    reflector: RoleModelConfig,
}

impl ModelRoles {
    /// Load and validate the whole configuration from the environment.
    /// Malformed specs and missing credentials fail here, before any node
    /// runs.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(EnvVars::capture())
    }

    pub fn from_vars(vars: EnvVars) -> Result<Self> {
        let google_api_key = vars
            .google_api_key
            .clone()
            .ok_or_else(|| ScriptoriumError::Config("GOOGLE_API_KEY is required".to_string()))?;

        let build = |spec: &Option<String>| -> Result<RoleModelConfig> {
            let spec = spec.as_deref().unwrap_or(DEFAULT_MODEL_SPEC);
            let (provider, model) = parse_model_spec(spec)?;
            let config = match provider {
                Provider::Gemini => RoleModelConfig {
                    provider,
                    model,
                    base_url: None,
                    api_key: Some(google_api_key.clone()),
                },
                Provider::OpenaiCompatible | Provider::Ollama => {
                    let base_url = vars.openai_compatible_base_url.clone().ok_or_else(|| {
                        ScriptoriumError::Config(format!(
                            "OPENAI_COMPATIBLE_BASE_URL is required for provider {}",
                            provider.as_str()
                        ))
                    })?;
                    RoleModelConfig {
                        provider,
                        model,
                        base_url: Some(base_url),
                        api_key: Some(
                            vars.openai_compatible_api_key
                                .clone()
                                .unwrap_or_else(|| DEFAULT_OPENAI_COMPATIBLE_KEY.to_string()),
                        ),
                    }
                }
            };
            Ok(config)
        };

        Ok(Self {
            researcher: build(&vars.researcher_model)?,
            writer: build(&vars.writer_model)?,
            reflector: build(&vars.reflector_model)?,
            google_api_key,
        })
    }

    pub fn for_role(&self, role: AgentRole) -> &RoleModelConfig {
        match role {
            AgentRole::Researcher => &self.researcher,
            AgentRole::Writer => &self.writer,
            AgentRole::Reflector => &self.reflector,
        }
    }
}

/// Options applied to every request issued through a resolved handle.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub temperature: Option<f32>,
    pub tools: Vec<ToolSpec>,
}

impl ResolveOptions {
    pub fn temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// Decorator that stamps resolve-time temperature and tool bindings onto
/// each request, so primary and fallback handles behind it always see the
/// same schema.
pub struct BoundClient {
    inner: Box<dyn LlmClient>,
    options: ResolveOptions,
}

impl BoundClient {
    pub fn new(inner: Box<dyn LlmClient>, options: ResolveOptions) -> Self {
        Self { inner, options }
    }
}

#[async_trait]
impl LlmClient for BoundClient {
    async fn complete(&self, mut request: LlmRequest) -> Result<LlmResponse> {
        if request.temperature.is_none() {
            request.temperature = self.options.temperature;
        }
        if request.tools.is_empty() {
            request.tools = self.options.tools.clone();
        }
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

fn build_base_client(config: &RoleModelConfig) -> Result<Box<dyn LlmClient>> {
    let client: Box<dyn LlmClient> = match config.provider {
        Provider::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ScriptoriumError::Config("Gemini requires an API key".to_string())
            })?;
            Box::new(GeminiClient::new(config.model.clone(), api_key))
        }
        Provider::OpenaiCompatible => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                ScriptoriumError::Config("openai_compatible requires a base URL".to_string())
            })?;
            Box::new(OpenAiCompatibleClient::new(
                base_url,
                config.model.clone(),
                config.api_key.clone(),
            ))
        }
        Provider::Ollama => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                ScriptoriumError::Config("ollama requires a base URL".to_string())
            })?;
            Box::new(OllamaClient::new(
                base_url,
                config.model.clone(),
                config.api_key.clone(),
            ))
        }
    };
    Ok(client)
}

/// Produce the invocable model handle for a role.
///
/// Non-Gemini primaries are chained with a fixed Gemini secondary so a
/// flaky local or gateway model degrades instead of aborting the run.
pub fn resolve_model(
    roles: &ModelRoles,
    role: AgentRole,
    options: ResolveOptions,
) -> Result<Arc<dyn LlmClient>> {
    let config = roles.for_role(role);
    let primary = build_base_client(config)?;

    let handle: Box<dyn LlmClient> = if config.provider != Provider::Gemini {
        info!(
            role = role.as_str(),
            provider = config.provider.as_str(),
            model = %config.model,
            fallback = FALLBACK_MODEL,
            "Resolved model with fallback chain"
        );
        let secondary = Box::new(GeminiClient::new(
            FALLBACK_MODEL.to_string(),
            roles.google_api_key.clone(),
        ));
        Box::new(FallbackClient::new(primary, secondary))
    } else {
        info!(
            role = role.as_str(),
            provider = config.provider.as_str(),
            model = %config.model,
            "Resolved model"
        );
        primary
    };

    Ok(Arc::new(BoundClient::new(handle, options)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_only_vars() -> EnvVars {
        EnvVars {
            google_api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn spec_round_trip_for_all_providers() {
        for (spec, provider, model) in [
            ("gemini:gemini-3-pro-preview", Provider::Gemini, "gemini-3-pro-preview"),
            ("openai_compatible:deepseek-chat", Provider::OpenaiCompatible, "deepseek-chat"),
            ("ollama:llama3.2:3b", Provider::Ollama, "llama3.2:3b"),
        ] {
            let (parsed_provider, parsed_model) = parse_model_spec(spec).unwrap();
            assert_eq!(parsed_provider, provider);
            assert_eq!(parsed_model, model);
            assert_eq!(
                format!("{}:{}", parsed_provider.as_str(), parsed_model),
                spec
            );
        }
    }

    #[test]
    fn malformed_spec_is_a_config_error() {
        assert!(matches!(
            parse_model_spec("no-colon-here"),
            Err(ScriptoriumError::Config(_))
        ));
        assert!(matches!(
            parse_model_spec("gemini:"),
            Err(ScriptoriumError::Config(_))
        ));
        assert!(matches!(
            parse_model_spec("gpt4:something"),
            Err(ScriptoriumError::Config(_))
        ));
    }

    #[test]
    fn roles_default_to_gemini_pro() {
        let roles = ModelRoles::from_vars(gemini_only_vars()).unwrap();
        for role in [AgentRole::Researcher, AgentRole::Writer, AgentRole::Reflector] {
            let config = roles.for_role(role);
            assert_eq!(config.provider, Provider::Gemini);
            assert_eq!(config.model, "gemini-3-pro-preview");
            assert_eq!(config.api_key.as_deref(), Some("test-key"));
        }
    }

    #[test]
    fn missing_google_key_fails_at_startup() {
        let err = ModelRoles::from_vars(EnvVars::default()).unwrap_err();
        assert!(matches!(err, ScriptoriumError::Config(_)));
    }

    #[test]
    fn non_primary_provider_requires_base_url() {
        let vars = EnvVars {
            writer_model: Some("ollama:llama3.2".to_string()),
            ..gemini_only_vars()
        };
        let err = ModelRoles::from_vars(vars).unwrap_err();
        assert!(err.to_string().contains("OPENAI_COMPATIBLE_BASE_URL"));
    }

    #[test]
    fn openai_compatible_key_defaults_for_local_servers() {
        let vars = EnvVars {
            writer_model: Some("ollama:llama3.2".to_string()),
            openai_compatible_base_url: Some("http://localhost:11434".to_string()),
            ..gemini_only_vars()
        };
        let roles = ModelRoles::from_vars(vars).unwrap();
        let writer = roles.for_role(AgentRole::Writer);
        assert_eq!(writer.api_key.as_deref(), Some("ollama"));
        assert_eq!(writer.base_url.as_deref(), Some("http://localhost:11434"));
        // other roles stay on the default
        assert_eq!(roles.for_role(AgentRole::Researcher).provider, Provider::Gemini);
    }

    #[test]
    fn resolve_gemini_role_is_bare() {
        let roles = ModelRoles::from_vars(gemini_only_vars()).unwrap();
        let handle = resolve_model(&roles, AgentRole::Writer, ResolveOptions::temperature(0.7)).unwrap();
        assert_eq!(handle.model_name(), "gemini-3-pro-preview");
    }

    #[test]
    fn resolve_non_gemini_role_reports_primary_name() {
        let vars = EnvVars {
            researcher_model: Some("openai_compatible:deepseek-chat".to_string()),
            openai_compatible_base_url: Some("https://api.deepseek.com/v1".to_string()),
            openai_compatible_api_key: Some("sk-test".to_string()),
            ..gemini_only_vars()
        };
        let roles = ModelRoles::from_vars(vars).unwrap();
        let handle =
            resolve_model(&roles, AgentRole::Researcher, ResolveOptions::default()).unwrap();
        // the fallback chain is transparent: callers see the primary
        assert_eq!(handle.model_name(), "deepseek-chat");
    }

    #[tokio::test]
    async fn bound_client_stamps_temperature_and_tools() {
        use crate::client::ToolSpec;
        use std::sync::Mutex;

        struct CapturingClient {
            seen: Arc<Mutex<Option<LlmRequest>>>,
        }

        #[async_trait]
        impl LlmClient for CapturingClient {
            async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
                *self.seen.lock().unwrap() = Some(request);
                Ok(LlmResponse {
                    content: "ok".to_string(),
                    model: "capture".to_string(),
                    tool_calls: vec![],
                    usage: None,
                    finish_reason: None,
                })
            }
            fn model_name(&self) -> &str {
                "capture"
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let inner = Box::new(CapturingClient { seen: seen.clone() });
        let options = ResolveOptions::temperature(0.0).with_tools(vec![ToolSpec {
            name: "read_url".to_string(),
            description: "Reads a URL.".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }]);
        let bound = BoundClient::new(inner, options);

        bound.complete(LlmRequest::default()).await.unwrap();

        let captured = seen.lock().unwrap().clone().unwrap();
        assert_eq!(captured.temperature, Some(0.0));
        assert_eq!(captured.tools.len(), 1);
        assert_eq!(captured.tools[0].name, "read_url");
    }
}
