//! switchboard HTTP Server
//!
//! Axum-based server exposing the conversation loop over REST.

mod handlers;
mod state;
mod tools;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switchboard_core::Agent;
use switchboard_runtime::{HttpTransport, settings};

use crate::handlers::{answer_handler, ask_handler, health_check, list_tools};
use crate::state::AppState;

fn app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/answer", post(answer_handler))
        .route("/api/ask", post(ask_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = settings::agent_config_from_env()?;
    let transport = Arc::new(HttpTransport::from_env()?);
    let agent = Agent::new(config, transport)?;

    for provider in agent.providers() {
        tracing::info!("Provider: {} ({})", provider.endpoint, provider.model);
    }

    tools::register_builtin(&agent)?;
    tracing::info!("Registered {} tools:", agent.tool_count());
    for schema in agent.tool_schemas() {
        tracing::info!("  • {}", schema.name);
    }

    let state = AppState {
        agent: Arc::new(agent),
    };

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("switchboard server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health      - Health check");
    tracing::info!("  GET  /api/tools   - Registered tools");
    tracing::info!("  POST /api/answer  - Run the conversation loop on a history");
    tracing::info!("  POST /api/ask     - Ask a single question");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
