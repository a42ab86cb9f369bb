//! Application State

use std::sync::Arc;

use switchboard_core::Agent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Agent with its providers and registered tools
    pub agent: Arc<Agent>,
}
