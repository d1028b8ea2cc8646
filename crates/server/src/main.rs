use anyhow::Context;
use gemini_mcp_core::{ApiCredentials, Config};
use llm::{GeminiClient, ModelConfig};
use log::{error, info, warn};
use server::{create_app, AppState};
use std::sync::Arc;
use tooling::{build_registry, Dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Set default log level if not already set
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting Gemini MCP server");

    let config = Config::load_from_env()
        .unwrap_or_else(|e| {
            warn!("Could not load config ({}), using defaults", e);
            Config::default()
        })
        .with_env_overrides()?;

    let credentials = match ApiCredentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let client = GeminiClient::new(&credentials, ModelConfig::from(&config.gemini))?;
    info!(
        "Gemini client ready (model {}, timeout {}s)",
        client.config().model,
        client.config().timeout_secs
    );

    let registry = build_registry(Arc::new(client))?;
    info!("Registered {} tools", registry.tool_count());

    let app = create_app(AppState::new(Dispatcher::new(Arc::new(registry))));

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
