//! # switchboard-core
//!
//! Conversation loop that drives a multi-turn exchange between a user, a set
//! of interchangeable LLM backends, and a set of callable tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Conversation│  │    Tools    │  │   ProviderPool      │  │
//! │  │    Loop     │──│   Registry  │──│  + ChatTransport    │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ChatTransport` trait keeps network code out of this crate; see
//! `switchboard-runtime` for the HTTP implementation.

pub mod error;
pub mod message;
pub mod pool;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Message, Role, ToolCall};
pub use pool::ProviderPool;
pub use provider::{ChatRequest, ChatResponse, ChatTransport, Choice, FinishReason, Provider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, Outcome};
pub use tool::{Tool, ToolArgs, ToolHandle, ToolOutcome, ToolRegistry, ToolSchema, ToolSpec};
