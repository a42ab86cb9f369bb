//! Backend Providers and Transport Boundary
//!
//! A [`Provider`] names one backend endpoint. The agent never talks HTTP itself:
//! it hands a [`ChatRequest`] to a [`ChatTransport`] together with the provider
//! it picked, and gets back a [`ChatResponse`] holding one or more choices.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_core::provider::{ChatTransport, Provider};
//!
//! let provider = Provider::new("https://api.openai.com/v1", "gpt-4o-mini")
//!     .with_credential(std::env::var("OPENAI_API_KEY")?);
//!
//! let response = transport.complete(&provider, &request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCall};
use crate::tool::ToolSchema;

/// One backend endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Base URL (e.g., "https://api.openai.com/v1")
    pub endpoint: String,

    /// API key, if the endpoint needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,

    /// Model identifier sent with every request
    #[serde(alias = "model_id", alias = "modelId")]
    pub model: String,
}

impl Provider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: None,
            model: model.into(),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AgentError::Config("provider endpoint must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::Config(format!(
                "provider {} has no model",
                self.endpoint
            )));
        }
        Ok(())
    }
}

// Keeps credentials out of logs.
impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

/// How the backend may use the offered tools
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Backend decides whether to call a tool
    #[default]
    Auto,
}

/// Request sent to a backend for the next assistant turn
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// Injected from the selected provider
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
}

/// Response from a backend
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One candidate completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub finish_reason: Option<FinishReason>,

    pub message: ChoiceMessage,
}

/// Assistant payload of a choice
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    FunctionCall,
    #[serde(other)]
    Other,
}

impl Choice {
    /// A final text answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            index: 0,
            finish_reason: Some(FinishReason::Stop),
            message: ChoiceMessage {
                content: Some(content.into()),
                tool_calls: None,
            },
        }
    }

    /// A turn that requests tool invocations
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            index: 0,
            finish_reason: Some(FinishReason::ToolCalls),
            message: ChoiceMessage {
                content: None,
                tool_calls: Some(calls),
            },
        }
    }

    /// Whether the backend stopped to have tools invoked
    pub fn requests_tools(&self) -> bool {
        self.finish_reason == Some(FinishReason::ToolCalls)
    }
}

impl ChatResponse {
    pub const fn new(choices: Vec<Choice>) -> Self {
        Self {
            choices,
            model: None,
        }
    }
}

/// Transport boundary for backends
///
/// Implement this trait to reach a new kind of backend. The agent works
/// exclusively through this interface; any `Err` counts as a failure of the
/// provider it was called with.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one request to `provider` and return its completion
    async fn complete(&self, provider: &Provider, request: &ChatRequest) -> Result<ChatResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_credential() {
        let provider =
            Provider::new("http://localhost:8080/v1", "local").with_credential("sk-secret");
        let printed = format!("{provider:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_provider_accepts_model_id_alias() {
        let provider: Provider = serde_json::from_value(json!({
            "endpoint": "http://localhost:8080/v1",
            "modelId": "llama3.2"
        }))
        .unwrap();
        assert_eq!(provider.model, "llama3.2");
        assert!(provider.credential.is_none());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(Provider::new(" ", "m").validate().is_err());
        assert!(Provider::new("http://x", "").validate().is_err());
        assert!(Provider::new("http://x", "m").validate().is_ok());
    }

    #[test]
    fn test_response_parsing() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [
                {
                    "index": 0,
                    "finish_reason": "tool_calls",
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "weather", "arguments": "{\"city\":\"Oslo\"}"}
                        }]
                    }
                },
                {
                    "index": 1,
                    "finish_reason": "eos",
                    "message": {"role": "assistant", "content": "hi", "tool_calls": null}
                }
            ]
        }))
        .unwrap();

        assert_eq!(response.choices.len(), 2);
        assert!(response.choices[0].requests_tools());
        assert_eq!(response.choices[1].finish_reason, Some(FinishReason::Other));
        assert!(!response.choices[1].requests_tools());
        assert!(response.choices[1].message.tool_calls.is_none());
    }

    #[test]
    fn test_missing_choices_is_empty() {
        let response: ChatResponse =
            serde_json::from_value(json!({"object": "chat.completion"})).unwrap();
        assert!(response.choices.is_empty());
    }
}
