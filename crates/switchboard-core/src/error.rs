//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Backend returned an error or a response the loop cannot use
    #[error("Provider error: {0}")]
    Provider(String),

    /// Backend unreachable (connect failure, timeout)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited by the backend
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Backend rejected the credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A tool with this name is already registered
    #[error("Tool already exists: {0}")]
    ToolExists(String),

    /// Tool handler failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Tool arguments could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable against the same backend
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::RateLimited(_))
    }

    /// Bare message carried by the error, without the variant prefix.
    ///
    /// Used when a handler failure is fed back to the model as a tool result.
    pub fn detail(&self) -> String {
        match self {
            Self::ToolExecution(msg) | Self::Other(msg) | Self::Parse(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
