//! # switchboard-runtime
//!
//! Runtime pieces for the switchboard agent.
//!
//! - **HttpTransport**: `ChatTransport` over any OpenAI-compatible
//!   `/chat/completions` endpoint
//! - **settings**: agent configuration from environment variables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_runtime::{HttpTransport, settings};
//!
//! let config = settings::agent_config_from_env()?;
//! let agent = Agent::new(config, Arc::new(HttpTransport::from_env()?))?;
//! let reply = agent.ask("What's the weather like?").await;
//! ```

pub mod openai;
pub mod settings;

pub use openai::{HttpTransport, HttpTransportConfig};

// Re-export core types for convenience
pub use switchboard_core::{
    Agent, AgentBuilder, AgentConfig, AgentError, ChatTransport, Message, Outcome, Provider,
    Result, Role, Tool, ToolSpec,
};
