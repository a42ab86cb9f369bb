//! Environment Configuration
//!
//! | Variable                     | Meaning                                        |
//! |------------------------------|------------------------------------------------|
//! | `SWITCHBOARD_NAME`           | agent name (required)                          |
//! | `SWITCHBOARD_DESCRIPTION`    | system prompt body (required)                  |
//! | `SWITCHBOARD_LIMITS`         | rules, one per line                            |
//! | `SWITCHBOARD_PROVIDERS`      | JSON array of `{endpoint, credential?, model}` |
//! | `SWITCHBOARD_MAX_ITERATIONS` | iteration bound (default 6)                    |

use switchboard_core::{
    error::{AgentError, Result},
    provider::Provider,
    reasoning::AgentConfig,
};

pub const NAME_VAR: &str = "SWITCHBOARD_NAME";
pub const DESCRIPTION_VAR: &str = "SWITCHBOARD_DESCRIPTION";
pub const LIMITS_VAR: &str = "SWITCHBOARD_LIMITS";
pub const PROVIDERS_VAR: &str = "SWITCHBOARD_PROVIDERS";
pub const MAX_ITERATIONS_VAR: &str = "SWITCHBOARD_MAX_ITERATIONS";

/// Read the agent configuration from the process environment
pub fn agent_config_from_env() -> Result<AgentConfig> {
    agent_config_from_lookup(|key| std::env::var(key).ok())
}

/// Read the agent configuration through `lookup`
pub fn agent_config_from_lookup<F>(lookup: F) -> Result<AgentConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AgentError::Config(format!("{key} is not set")))
    };

    let mut config = AgentConfig::new(required(NAME_VAR)?, required(DESCRIPTION_VAR)?);

    if let Some(limits) = lookup(LIMITS_VAR) {
        config.limits = limits
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
    }

    let providers = required(PROVIDERS_VAR)?;
    config.providers = serde_json::from_str::<Vec<Provider>>(&providers)
        .map_err(|e| AgentError::Config(format!("{PROVIDERS_VAR}: {e}")))?;

    if let Some(max) = lookup(MAX_ITERATIONS_VAR) {
        config.max_iterations = max
            .trim()
            .parse()
            .map_err(|e| AgentError::Config(format!("{MAX_ITERATIONS_VAR}: {e}")))?;
    }

    config.validate()?;
    Ok(config)
}
