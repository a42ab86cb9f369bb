//! OpenAI-compatible Transport
//!
//! Implementation of `ChatTransport` for any backend that speaks the
//! `/chat/completions` protocol (OpenAI, vLLM, llama.cpp server, Ollama's
//! compatibility endpoint, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use switchboard_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{ChatRequest, ChatResponse, ChatTransport, Provider, ToolChoice},
    tool::ToolSchema,
};

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl HttpTransportConfig {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("SWITCHBOARD_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Self {
            timeout_secs,
            ..Default::default()
        }
    }
}

/// Body actually put on the wire
#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSchema],
    // Backends reject tool_choice when no tools are offered.
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

fn no_tools(tools: &&[ToolSchema]) -> bool {
    tools.is_empty()
}

impl<'a> From<&'a ChatRequest> for WireRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            tools: &request.tools,
            tool_choice: (!request.tools.is_empty()).then_some(request.tool_choice),
        }
    }
}

/// Chat-completions transport over HTTP
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create with default timeouts
    pub fn new() -> Result<Self> {
        Self::from_config(&HttpTransportConfig::default())
    }

    /// Create from configuration
    pub fn from_config(config: &HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(&HttpTransportConfig::from_env())
    }

    /// Completions URL for a provider endpoint
    pub fn completions_url(endpoint: &str) -> String {
        format!("{}/chat/completions", endpoint.trim_end_matches('/'))
    }
}

fn send_error(err: &reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> AgentError {
    let excerpt: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AgentError::Auth(format!("{status}: {excerpt}"))
        }
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(excerpt),
        _ => AgentError::Provider(format!("{status}: {excerpt}")),
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, provider: &Provider, request: &ChatRequest) -> Result<ChatResponse> {
        let url = Self::completions_url(&provider.endpoint);
        tracing::debug!(
            %url,
            model = %request.model,
            messages = request.messages.len(),
            "POST chat completion"
        );

        let mut builder = self.client.post(&url).json(&WireRequest::from(request));
        if let Some(key) = &provider.credential {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid response body: {e}")))
    }
}
