//! Built-in Tools

use async_trait::async_trait;
use switchboard_core::{
    Agent, AgentError, Result,
    tool::{Tool, ToolArgs, ToolSchema, arg_str},
};

/// Returns the current UTC time
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("current_time", "Get the current date and time (UTC)")
            .parameter("format", "Output format: 'iso', 'human', or 'unix' (default: human)")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String> {
        let now = chrono::Utc::now();

        let output = match arg_str(args, "format").as_deref().unwrap_or("human") {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            "human" => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
            other => {
                return Err(AgentError::ToolExecution(format!(
                    "Unknown format '{other}'. Use 'iso', 'human', or 'unix'."
                )));
            }
        };

        Ok(output)
    }
}

/// Register every built-in tool on `agent`
pub fn register_builtin(agent: &Agent) -> Result<()> {
    // Handles are dropped: built-ins live as long as the agent.
    agent.register(CurrentTimeTool)?;
    Ok(())
}
