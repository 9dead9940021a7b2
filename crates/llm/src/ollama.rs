use async_trait::async_trait;
use scriptorium_common::ScriptoriumError;
use scriptorium_common::{MessageRole, PipelineMessage, Result, ToolCall};
use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, LlmRequest, LlmResponse, TokenUsage};

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OllamaFunctionCall {
    name: String,
    /// Unlike the OpenAI dialect, Ollama sends arguments as a JSON object.
    arguments: serde_json::Value,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    model: String,
    message: OllamaMessage,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

/// Client for a local Ollama server (`/api/chat`).
pub struct OllamaClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url,
            model,
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    fn role_to_string(role: &MessageRole) -> &'static str {
        match role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }

    fn build_messages(request: &LlmRequest) -> Vec<OllamaMessage> {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system_prompt {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
                tool_calls: Vec::new(),
            });
        }
        for msg in &request.messages {
            messages.push(Self::convert_message(msg));
        }
        messages
    }

    fn convert_message(msg: &PipelineMessage) -> OllamaMessage {
        OllamaMessage {
            role: Self::role_to_string(&msg.role).to_string(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| OllamaToolCall {
                    function: OllamaFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        }
    }

    fn build_tools(request: &LlmRequest) -> Vec<serde_json::Value> {
        request
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let body = OllamaRequest {
            model: self.model.clone(),
            messages: Self::build_messages(&request),
            stream: false,
            options: Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }),
            tools: Self::build_tools(&request),
        };

        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| ScriptoriumError::Invocation(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ScriptoriumError::Invocation(format!(
                "Ollama API error {status}: {body_text}"
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ScriptoriumError::Invocation(format!("Failed to parse Ollama response: {e}")))?;

        let tool_calls = ollama_response
            .message
            .tool_calls
            .iter()
            .map(|call| ToolCall {
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            })
            .collect();

        let usage = match (ollama_response.prompt_eval_count, ollama_response.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
            }),
        };

        Ok(LlmResponse {
            content: ollama_response.message.content,
            model: ollama_response.model,
            tool_calls,
            usage,
            finish_reason: ollama_response.done_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_endpoint_message_shape() {
        let request = LlmRequest {
            system_prompt: Some("Keep it short.".to_string()),
            messages: vec![
                PipelineMessage::user("Explain lifetimes"),
                PipelineMessage::tool_result("read_url", "page body"),
            ],
            ..Default::default()
        };
        let messages = OllamaClient::build_messages(&request);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[2].role, "tool");
        assert_eq!(messages[2].content, "page body");
    }

    #[test]
    fn tool_arguments_stay_structured() {
        let msg = PipelineMessage::tool_request(
            "",
            vec![ToolCall {
                name: "read_url".to_string(),
                arguments: json!({"url": "https://example.com"}),
            }],
        );
        let converted = OllamaClient::convert_message(&msg);
        assert_eq!(converted.tool_calls[0].function.arguments["url"], "https://example.com");
    }
}
