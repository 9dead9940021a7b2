//! Message types threaded through the editorial pipeline.

use serde::{Deserialize, Serialize};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// A structured request from the model asking the orchestrator to invoke
/// an external capability before continuing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments as a JSON object matching the tool's schema.
    pub arguments: serde_json::Value,
}

/// One entry in the pipeline's append-only message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMessage {
    pub role: MessageRole,
    pub content: String,

    /// Tool invocations requested by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// For tool turns, the name of the tool that produced this result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl PipelineMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    /// An assistant turn that requests tool invocations instead of text.
    pub fn tool_request(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_name: None,
        }
    }

    /// A tool turn carrying the result of an invocation back to the model.
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: Some(tool_name.into()),
        }
    }

    /// Whether this turn asks the orchestrator to run a tool.
    pub fn requests_tool(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether this turn is the output of a tool invocation.
    pub fn is_tool_result(&self) -> bool {
        self.role == MessageRole::Tool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&MessageRole::Tool).unwrap(), "\"tool\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = PipelineMessage::tool_request(
            "",
            vec![ToolCall {
                name: "read_url".to_string(),
                arguments: json!({"url": "https://example.com"}),
            }],
        );
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: PipelineMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.role, MessageRole::Assistant);
        assert_eq!(decoded.tool_calls.len(), 1);
        assert_eq!(decoded.tool_calls[0].name, "read_url");
        assert!(decoded.requests_tool());
    }

    #[test]
    fn plain_assistant_turn_requests_nothing() {
        let msg = PipelineMessage::assistant("Here is the summary.");
        assert!(!msg.requests_tool());
        assert!(!msg.is_tool_result());
    }

    #[test]
    fn tool_result_links_back_by_name() {
        let msg = PipelineMessage::tool_result("read_url", "page text");
        assert!(msg.is_tool_result());
        assert_eq!(msg.tool_name.as_deref(), Some("read_url"));
        // tool_calls is elided from the wire format when empty
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(!encoded.contains("tool_calls"));
    }
}
