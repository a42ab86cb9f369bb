//! Tool System
//!
//! Named tools the backend may ask the agent to run. Lookup of an unknown
//! name, unparsable arguments, and handler failures all come back as a
//! [`ToolOutcome`] whose text is fed to the model; none of them escape as
//! errors.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::error::{AgentError, Result};
use crate::message::ToolCall;

/// Parsed tool arguments: parameter name to value (normally a string)
pub type ToolArgs = Map<String, Value>;

/// Tool definition schema (for LLM function calling)
///
/// Every parameter is free-form text and optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter name to description
    pub parameters: BTreeMap<String, String>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), description.into());
        self
    }

    /// Function-calling JSON for this tool
    pub fn to_function_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, description)| {
                (
                    name.clone(),
                    json!({"type": "string", "description": description}),
                )
            })
            .collect();

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                }
            }
        })
    }
}

impl Serialize for ToolSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_function_json().serialize(serializer)
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with parsed arguments
    async fn execute(&self, args: &ToolArgs) -> Result<String>;
}

type Handler = Arc<dyn Fn(ToolArgs) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync>;

/// Description, parameters and handler of a closure-backed tool
#[derive(Clone)]
pub struct ToolSpec {
    pub description: String,
    pub parameters: BTreeMap<String, String>,
    handler: Handler,
}

impl ToolSpec {
    pub fn new<F, Fut>(description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self {
            description: description.into(),
            parameters: BTreeMap::new(),
            handler: Arc::new(move |args: ToolArgs| handler(args).boxed()),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), description.into());
        self
    }

    pub(crate) fn into_tool(self, name: String) -> FunctionTool {
        FunctionTool {
            schema: ToolSchema {
                name,
                description: self.description,
                parameters: self.parameters,
            },
            handler: self.handler,
        }
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Tool backed by an async closure
pub struct FunctionTool {
    schema: ToolSchema,
    handler: Handler,
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        Ok((self.handler)(args.clone()).await?)
    }
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; fails if the name is taken
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<Arc<dyn Tool>> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool; fails if the name is taken
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<Arc<dyn Tool>> {
        let name = tool.schema().name;
        if self.tools.contains_key(&name) {
            return Err(AgentError::ToolExists(name));
        }
        self.tools.insert(name, Arc::clone(&tool));
        Ok(tool)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    /// All tool schemas, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub(crate) type SharedRegistry = Arc<RwLock<ToolRegistry>>;

// A panicking handler cannot leave the map half-updated, so poisoned guards are safe to reuse.
pub(crate) fn read_registry(registry: &RwLock<ToolRegistry>) -> RwLockReadGuard<'_, ToolRegistry> {
    registry.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub(crate) fn write_registry(
    registry: &RwLock<ToolRegistry>,
) -> RwLockWriteGuard<'_, ToolRegistry> {
    registry.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Deregistration handle returned when a tool is registered
#[derive(Debug)]
pub struct ToolHandle {
    name: String,
    tool: Weak<dyn Tool>,
    registry: Weak<RwLock<ToolRegistry>>,
}

impl ToolHandle {
    pub(crate) fn new(tool: &Arc<dyn Tool>, registry: &SharedRegistry) -> Self {
        Self {
            name: tool.schema().name,
            tool: Arc::downgrade(tool),
            registry: Arc::downgrade(registry),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deregister the tool.
    ///
    /// Returns false if it was already removed, or if the name now belongs to
    /// a different tool registered later.
    pub fn remove(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = write_registry(&registry);
        match registry.get(&self.name) {
            Some(current) if Weak::ptr_eq(&self.tool, &Arc::downgrade(&current)) => {
                registry.remove(&self.name);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.schema().name).finish()
    }
}

/// Parse serialized tool arguments.
///
/// Empty or whitespace-only text is an empty map; anything else must be a
/// JSON object.
pub fn parse_arguments(text: &str) -> Result<ToolArgs> {
    if text.trim().is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(AgentError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Free-text parameter from parsed arguments.
///
/// Strings are borrowed; other non-null values are rendered as JSON text.
pub fn arg_str<'a>(args: &'a ToolArgs, key: &str) -> Option<Cow<'a, str>> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(Cow::Borrowed(text)),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Result of dispatching one tool call; every variant becomes a tool message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Handler output
    Output(String),
    /// No tool registered under the requested name
    NotFound(String),
    /// Arguments were not a JSON object; the handler was not run
    InvalidArguments(String),
    /// Handler returned an error or panicked
    Failed(String),
}

impl ToolOutcome {
    pub fn not_found(name: &str) -> Self {
        Self::NotFound(format!("Tool '{name}' not found."))
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Text fed back to the model
    pub fn text(&self) -> &str {
        match self {
            Self::Output(text)
            | Self::NotFound(text)
            | Self::InvalidArguments(text)
            | Self::Failed(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Output(text)
            | Self::NotFound(text)
            | Self::InvalidArguments(text)
            | Self::Failed(text) => text,
        }
    }
}

fn internal_error(name: &str) -> String {
    format!("Internal error while running tool '{name}'.")
}

/// Run `tool` for `call`, turning every failure into a [`ToolOutcome`]
pub async fn invoke(tool: &dyn Tool, call: &ToolCall) -> ToolOutcome {
    let name = call.name();

    let args = match parse_arguments(call.arguments()) {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!(tool = %name, error = %e, "Unparsable tool arguments");
            return ToolOutcome::InvalidArguments(format!(
                "Failed to parse arguments for tool '{name}': {}",
                e.detail()
            ));
        }
    };

    tracing::debug!(tool = %name, call_id = %call.id, "Executing tool");

    match AssertUnwindSafe(tool.execute(&args)).catch_unwind().await {
        Ok(Ok(output)) => ToolOutcome::Output(output),
        Ok(Err(e)) => {
            tracing::warn!(tool = %name, error = %e, "Tool failed");
            let detail = e.detail();
            if detail.trim().is_empty() {
                ToolOutcome::Failed(internal_error(name))
            } else {
                ToolOutcome::Failed(detail)
            }
        }
        Err(_) => {
            tracing::warn!(tool = %name, "Tool panicked");
            ToolOutcome::Failed(internal_error(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("echo", "Repeat the input").parameter("input", "Text to repeat")
        }

        async fn execute(&self, args: &ToolArgs) -> Result<String> {
            Ok(arg_str(args, "input").unwrap_or_default().to_string())
        }
    }

    fn counting_tool(counter: Arc<AtomicUsize>) -> FunctionTool {
        ToolSpec::new("Count calls", move |_args| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("counted".to_string())
            }
        })
        .into_tool("count".into())
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new();
        let first = registry.register(Echo).unwrap();

        let err = registry.register(Echo).unwrap_err();
        assert!(matches!(err, AgentError::ToolExists(ref name) if name == "echo"));
        assert!(Arc::ptr_eq(&registry.get("echo").unwrap(), &first));
    }

    #[test]
    fn test_schema_function_json() {
        let value = serde_json::to_value(Echo.schema()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "function",
                "function": {
                    "name": "echo",
                    "description": "Repeat the input",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "input": {"type": "string", "description": "Text to repeat"}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_schemas_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo).unwrap();
        registry
            .register(counting_tool(Arc::new(AtomicUsize::new(0))))
            .unwrap();

        let names: Vec<_> = registry.schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["count", "echo"]);
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_empty());
        assert!(parse_arguments("  \n").unwrap().is_empty());
        assert_eq!(
            arg_str(&parse_arguments(r#"{"input":"hi"}"#).unwrap(), "input").as_deref(),
            Some("hi")
        );
        assert!(parse_arguments("{bad json").is_err());
        assert!(matches!(
            parse_arguments("[1, 2]"),
            Err(AgentError::Parse(ref msg)) if msg.contains("an array")
        ));
    }

    #[test]
    fn test_arg_str_renders_scalars() {
        let args = parse_arguments(r#"{"n": 42, "flag": true, "none": null}"#).unwrap();
        assert_eq!(arg_str(&args, "n").as_deref(), Some("42"));
        assert_eq!(arg_str(&args, "flag").as_deref(), Some("true"));
        assert_eq!(arg_str(&args, "none"), None);
        assert_eq!(arg_str(&args, "missing"), None);
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let call = ToolCall::new("c1", "echo", r#"{"input":"ping"}"#);
        assert_eq!(invoke(&Echo, &call).await, ToolOutcome::Output("ping".into()));
    }

    #[tokio::test]
    async fn test_invoke_empty_arguments() {
        let call = ToolCall::new("c1", "echo", "");
        assert_eq!(invoke(&Echo, &call).await, ToolOutcome::Output(String::new()));
    }

    #[tokio::test]
    async fn test_bad_json_never_runs_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let tool = counting_tool(Arc::clone(&counter));

        let outcome = invoke(&tool, &ToolCall::new("c1", "count", "{bad json")).await;

        assert!(matches!(outcome, ToolOutcome::InvalidArguments(_)));
        assert!(!outcome.is_success());
        assert!(outcome.text().starts_with("Failed to parse arguments for tool 'count'"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_message_used() {
        let tool = ToolSpec::new("Always fails", |_args| async {
            Err(anyhow::anyhow!("quota exceeded"))
        })
        .into_tool("flaky".into());

        let outcome = invoke(&tool, &ToolCall::new("c1", "flaky", "{}")).await;
        assert_eq!(outcome, ToolOutcome::Failed("quota exceeded".into()));
    }

    #[tokio::test]
    async fn test_handler_blank_error_uses_generic_text() {
        let tool = ToolSpec::new("Fails silently", |_args| async { Err(anyhow::anyhow!("")) })
            .into_tool("mute".into());

        let outcome = invoke(&tool, &ToolCall::new("c1", "mute", "")).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failed("Internal error while running tool 'mute'.".into())
        );
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let tool = ToolSpec::new("Panics", |_args| async {
            if true {
                panic!("handler bug");
            }
            Ok(String::new())
        })
        .into_tool("boom".into());

        let outcome = invoke(&tool, &ToolCall::new("c1", "boom", "")).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failed("Internal error while running tool 'boom'.".into())
        );
    }

    #[test]
    fn test_handle_removes_only_its_own_tool() {
        let registry: SharedRegistry = Arc::new(RwLock::new(ToolRegistry::new()));
        let first = write_registry(&registry).register(Echo).unwrap();
        let stale = ToolHandle::new(&first, &registry);
        let again = ToolHandle::new(&first, &registry);

        assert!(stale.remove());
        let second = write_registry(&registry).register(Echo).unwrap();
        assert!(!again.remove());
        assert!(Arc::ptr_eq(&read_registry(&registry).get("echo").unwrap(), &second));
    }
}
