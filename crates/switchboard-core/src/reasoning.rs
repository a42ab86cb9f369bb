//! Conversation Loop
//!
//! Drives one `answer` call: pick a live provider, send the history, and
//! either return the backend's final text or run the tools it asked for and
//! go around again.
//!
//! ```text
//! SELECT_PROVIDER ──► AWAIT_RESPONSE ──► PROCESS_CHOICES ──► answered
//!       ▲                   │                   │
//!       └── discard ◄───────┘                   └──► DISPATCH_TOOLS ──► next iteration
//! ```
//!
//! Provider failures are retried against another provider within the same
//! iteration; every usable response, even a tool-only one, consumes one
//! iteration. The call always returns with a message appended to the history.

use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCall};
use crate::pool::ProviderPool;
use crate::provider::{ChatRequest, ChatResponse, ChatTransport, Provider, ToolChoice};
use crate::tool::{
    self, SharedRegistry, Tool, ToolArgs, ToolHandle, ToolOutcome, ToolRegistry, ToolSchema,
    ToolSpec, read_registry, write_registry,
};

/// Iteration bound per `answer` call
pub const DEFAULT_MAX_ITERATIONS: usize = 6;

/// Appended when every provider failed during an iteration
pub const EXHAUSTED_MESSAGE: &str =
    "I'm sorry, but I couldn't reach any language model to answer you. Please try again later.";

/// Appended when the iteration bound is reached without a final answer
pub const ITERATION_LIMIT_MESSAGE: &str = "I'm sorry, but I can't respond to that right now.";

/// Agent configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name, embedded in the system prompt
    pub name: String,

    /// System prompt body
    pub description: String,

    /// Behavioral rules, one line each
    #[serde(default)]
    pub limits: Vec<String>,

    /// Backends, tried in random order
    pub providers: Vec<Provider>,

    /// Maximum backend round trips that produce a response
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

const fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            limits: Vec::new(),
            providers: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AgentError::Config("agent name is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(AgentError::Config("agent description is required".into()));
        }
        if self.providers.is_empty() {
            return Err(AgentError::Config("at least one provider is required".into()));
        }
        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        self.providers.iter().try_for_each(Provider::validate)
    }
}

/// How an `answer` call ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The backend produced a final answer
    Answered,
    /// No provider produced a usable response
    ProvidersExhausted,
    /// The iteration bound was reached
    IterationLimit,
}

/// The main Agent struct
///
/// Tools may be registered or removed through `&self`. Doing so while an
/// `answer` call is in flight is allowed but not coordinated with it: the
/// change is seen by whatever request or dispatch that call performs next.
pub struct Agent {
    config: AgentConfig,
    providers: Vec<Arc<Provider>>,
    tools: SharedRegistry,
    transport: Arc<dyn ChatTransport>,
}

impl Agent {
    /// Create a new agent
    pub fn new(config: AgentConfig, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        config.validate()?;
        let providers = config.providers.iter().cloned().map(Arc::new).collect();

        Ok(Self {
            config,
            providers,
            tools: Arc::new(RwLock::new(ToolRegistry::new())),
            transport,
        })
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn providers(&self) -> &[Arc<Provider>] {
        &self.providers
    }

    /// Register a closure-backed tool under `name`.
    ///
    /// Fails with [`AgentError::ToolExists`] if the name is taken; the
    /// existing tool stays registered.
    pub fn add_tool(&self, name: impl Into<String>, spec: ToolSpec) -> Result<ToolHandle> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AgentError::Config("tool name must not be empty".into()));
        }
        self.register_arc(Arc::new(spec.into_tool(name)))
    }

    /// Register a tool under a generated name with a single `input` parameter
    pub fn add_fn_tool<F, Fut>(
        &self,
        description: impl Into<String>,
        handler: F,
    ) -> Result<ToolHandle>
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let name = format!("tool_{}", uuid::Uuid::new_v4().simple());
        let spec = ToolSpec::new(description, handler).parameter("input", "Free-form input");
        self.add_tool(name, spec)
    }

    /// Register a trait-based tool
    pub fn register<T: Tool + 'static>(&self, tool: T) -> Result<ToolHandle> {
        self.register_arc(Arc::new(tool))
    }

    fn register_arc(&self, tool: Arc<dyn Tool>) -> Result<ToolHandle> {
        let tool = write_registry(&self.tools).register_arc(tool)?;
        tracing::debug!(tool = %tool.schema().name, "Registered tool");
        Ok(ToolHandle::new(&tool, &self.tools))
    }

    /// Deregister a tool by name
    pub fn remove_tool(&self, name: &str) -> bool {
        write_registry(&self.tools).remove(name).is_some()
    }

    /// Schemas of all registered tools, sorted by name
    pub fn tool_schemas(&self) -> Vec<ToolSchema> {
        read_registry(&self.tools).schemas()
    }

    pub fn tool_count(&self) -> usize {
        read_registry(&self.tools).len()
    }

    /// Leading system message
    pub fn system_message(&self) -> Message {
        Message::system(format!(
            "Your name is {}.\n\n{}",
            self.config.name, self.config.description
        ))
    }

    /// Trailing rules message, if any limits are configured
    pub fn limits_message(&self) -> Option<Message> {
        if self.config.limits.is_empty() {
            return None;
        }
        let mut rules = String::from("You must follow these rules:");
        for limit in &self.config.limits {
            rules.push_str("\n- ");
            rules.push_str(limit);
        }
        Some(Message::system(rules))
    }

    /// Build the request sent to `provider` for the current history
    pub fn build_request(&self, provider: &Provider, history: &[Message]) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(self.system_message());
        messages.extend_from_slice(history);
        messages.extend(self.limits_message());

        ChatRequest {
            model: provider.model.clone(),
            messages,
            tools: self.tool_schemas(),
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Run the conversation loop on `history`, appending to it in place.
    ///
    /// On return `history` is the updated conversation: the caller's messages
    /// untouched, followed by every message this call produced, ending with an
    /// assistant message. Never fails: provider exhaustion and the iteration
    /// bound end the call with an apology message appended, reported through
    /// the returned [`Outcome`].
    pub async fn answer(&self, history: &mut Vec<Message>) -> Outcome {
        let mut pool = ProviderPool::new(&self.providers);

        for iteration in 1..=self.config.max_iterations {
            let Some(response) = self.next_response(&mut pool, history, iteration).await else {
                tracing::info!(iteration, "All providers failed");
                history.push(Message::assistant(EXHAUSTED_MESSAGE));
                return Outcome::ProvidersExhausted;
            };

            if self.process_choices(response, history).await {
                tracing::info!(iteration, "Answered");
                return Outcome::Answered;
            }
        }

        tracing::info!(max = self.config.max_iterations, "Iteration limit reached");
        history.push(Message::assistant(ITERATION_LIMIT_MESSAGE));
        Outcome::IterationLimit
    }

    /// Run with a simple string input and return the final assistant text
    pub async fn ask(&self, question: impl Into<String>) -> String {
        let mut history = vec![Message::user(question)];
        self.answer(&mut history).await;
        history
            .last()
            .and_then(Message::content)
            .unwrap_or_default()
            .to_string()
    }

    /// Try live providers until one returns at least one choice
    async fn next_response(
        &self,
        pool: &mut ProviderPool,
        history: &[Message],
        iteration: usize,
    ) -> Option<ChatResponse> {
        while let Some(provider) = pool.pick_one() {
            tracing::debug!(
                iteration,
                endpoint = %provider.endpoint,
                model = %provider.model,
                live = pool.len(),
                "Sending request"
            );

            let request = self.build_request(&provider, history);
            match self.transport.complete(&provider, &request).await {
                Ok(response) if !response.choices.is_empty() => return Some(response),
                Ok(_) => {
                    tracing::warn!(
                        endpoint = %provider.endpoint,
                        "Provider returned no choices, discarding"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %provider.endpoint,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Provider failed, discarding"
                    );
                }
            }
            pool.discard(&provider);
        }
        None
    }

    /// Apply every choice in order. Returns true once a final answer is appended.
    async fn process_choices(&self, response: ChatResponse, history: &mut Vec<Message>) -> bool {
        for choice in response.choices {
            if !choice.requests_tools() {
                let content = choice.message.content.unwrap_or_default();
                history.push(Message::assistant(content));
                return true;
            }

            let calls = choice.message.tool_calls.unwrap_or_default();
            history.push(Message::assistant_tool_calls(
                choice.message.content,
                calls.clone(),
            ));

            for call in &calls {
                let outcome = self.dispatch(call).await;
                history.push(Message::tool(outcome.into_text(), call.id.clone()));
            }
        }
        false
    }

    async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        // Guard must be dropped before awaiting the handler.
        let found = read_registry(&self.tools).get(call.name());
        match found {
            Some(handler) => {
                let outcome = tool::invoke(handler.as_ref(), call).await;
                if !outcome.is_success() {
                    tracing::warn!(
                        tool = %call.name(),
                        result = %outcome.text(),
                        "Tool call failed"
                    );
                }
                outcome
            }
            None => {
                tracing::warn!(tool = %call.name(), "Unknown tool requested");
                ToolOutcome::not_found(call.name())
            }
        }
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    config: AgentConfig,
    transport: Option<Arc<dyn ChatTransport>>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::new("", ""),
            transport: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.config.limits.push(limit.into());
        self
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.config.providers.push(provider);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let transport = self
            .transport
            .ok_or_else(|| AgentError::Config("Transport is required".into()))?;

        Agent::new(self.config, transport)
    }
}
