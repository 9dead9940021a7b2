use async_trait::async_trait;
use scriptorium_common::ScriptoriumError;
use scriptorium_common::{MessageRole, PipelineMessage, Result, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{LlmClient, LlmRequest, LlmResponse, TokenUsage};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiToolset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct GeminiFunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolset {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

pub struct GeminiClient {
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    fn role_to_string(role: &MessageRole) -> &'static str {
        match role {
            // system turns ride in the top-level systemInstruction field
            MessageRole::System => "user",
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
            // tool results are user turns carrying a functionResponse part
            MessageRole::Tool => "user",
        }
    }

    fn message_to_content(msg: &PipelineMessage) -> GeminiContent {
        let mut parts = Vec::new();

        if msg.is_tool_result() {
            parts.push(GeminiPart {
                function_response: Some(GeminiFunctionResponse {
                    name: msg.tool_name.clone().unwrap_or_default(),
                    response: json!({ "content": msg.content }),
                }),
                ..Default::default()
            });
        } else {
            if !msg.content.is_empty() {
                parts.push(GeminiPart {
                    text: Some(msg.content.clone()),
                    ..Default::default()
                });
            }
            for call in &msg.tool_calls {
                parts.push(GeminiPart {
                    function_call: Some(GeminiFunctionCall {
                        name: call.name.clone(),
                        args: call.arguments.clone(),
                    }),
                    ..Default::default()
                });
            }
        }

        GeminiContent {
            role: Self::role_to_string(&msg.role).to_string(),
            parts,
        }
    }

    fn build_request(request: &LlmRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .filter(|msg| msg.role != MessageRole::System)
            .map(Self::message_to_content)
            .collect();

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiToolset {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        GeminiRequest {
            contents,
            system_instruction: request.system_prompt.as_ref().map(|text| {
                GeminiSystemInstruction {
                    parts: vec![GeminiPart {
                        text: Some(text.clone()),
                        ..Default::default()
                    }],
                }
            }),
            tools,
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{GEMINI_API_BASE}/models/{}:generateContent", self.model);
        let body = Self::build_request(&request);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ScriptoriumError::Invocation(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ScriptoriumError::Invocation(format!(
                "Gemini API error {status}: {body_text}"
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ScriptoriumError::Invocation(format!("Failed to parse Gemini response: {e}")))?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ScriptoriumError::Invocation("No candidates in Gemini response".to_string()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        if let Some(candidate_content) = candidate.content {
            for part in candidate_content.parts {
                if let Some(text) = part.text {
                    content.push_str(&text);
                }
                if let Some(call) = part.function_call {
                    tool_calls.push(ToolCall {
                        name: call.name,
                        arguments: call.args,
                    });
                }
            }
        }

        Ok(LlmResponse {
            content,
            model: gemini_response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
            tool_calls,
            usage: gemini_response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
            }),
            finish_reason: candidate.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToolSpec;

    fn sample_tool() -> ToolSpec {
        ToolSpec {
            name: "read_url".to_string(),
            description: "Reads the content of a given URL.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"]
            }),
        }
    }

    #[test]
    fn request_body_matches_gemini_format() {
        let request = LlmRequest {
            system_prompt: Some("Be a researcher.".to_string()),
            messages: vec![
                PipelineMessage::user("Research WebGPU"),
                PipelineMessage::assistant("Here is what I found."),
            ],
            temperature: Some(0.0),
            max_tokens: None,
            tools: vec![sample_tool()],
        };

        let body = GeminiClient::build_request(&request);
        let encoded = serde_json::to_value(&body).unwrap();

        assert_eq!(encoded["systemInstruction"]["parts"][0]["text"], "Be a researcher.");
        assert_eq!(encoded["contents"][0]["role"], "user");
        assert_eq!(encoded["contents"][0]["parts"][0]["text"], "Research WebGPU");
        assert_eq!(encoded["contents"][1]["role"], "model");
        assert_eq!(
            encoded["tools"][0]["functionDeclarations"][0]["name"],
            "read_url"
        );
        let temp = encoded["generationConfig"]["temperature"].as_f64().unwrap();
        assert!(temp.abs() < 0.001);
    }

    #[test]
    fn tool_round_trip_turns_map_to_function_parts() {
        let request = LlmRequest {
            system_prompt: None,
            messages: vec![
                PipelineMessage::user("Read https://example.com"),
                PipelineMessage::tool_request(
                    "",
                    vec![ToolCall {
                        name: "read_url".to_string(),
                        arguments: json!({"url": "https://example.com"}),
                    }],
                ),
                PipelineMessage::tool_result("read_url", "Example Domain"),
            ],
            ..Default::default()
        };

        let body = GeminiClient::build_request(&request);
        let encoded = serde_json::to_value(&body).unwrap();

        // assistant tool request becomes a model functionCall part
        assert_eq!(encoded["contents"][1]["role"], "model");
        assert_eq!(
            encoded["contents"][1]["parts"][0]["functionCall"]["name"],
            "read_url"
        );
        // the tool result echoes back as a user functionResponse part
        assert_eq!(encoded["contents"][2]["role"], "user");
        assert_eq!(
            encoded["contents"][2]["parts"][0]["functionResponse"]["response"]["content"],
            "Example Domain"
        );
    }

    #[test]
    fn system_messages_never_appear_in_contents() {
        let mut system_turn = PipelineMessage::user("instruction");
        system_turn.role = MessageRole::System;
        let request = LlmRequest {
            system_prompt: Some("Top-level instruction".to_string()),
            messages: vec![system_turn, PipelineMessage::user("Hello")],
            ..Default::default()
        };

        let body = GeminiClient::build_request(&request);
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn tools_field_elided_when_unbound() {
        let request = LlmRequest {
            messages: vec![PipelineMessage::user("Hello")],
            ..Default::default()
        };
        let body = GeminiClient::build_request(&request);
        let encoded = serde_json::to_value(&body).unwrap();
        assert!(encoded.get("tools").is_none());
    }
}
