//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes the Contextual Rules Hub tools and resources over stdio
//! for editor and agent-host integrations. Rule sources come from indexed environment bindings;
//! see the `config` module for the recognized variables.
use anyhow::{Context, Result};
use rmcp::{service::ServiceExt, transport::stdio};
use ruleshub::{
    config, logging,
    mcp::{RuleService, RulesHubServer},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let default_level =
        std::env::var(config::LOG_LEVEL_ENV).unwrap_or_else(|_| "INFO".to_string());
    logging::init_tracing(&default_level);

    let service = Arc::new(RuleService::new());
    // Not fatal: tools retry initialization on demand.
    if let Err(error) = service.initialize().await {
        tracing::error!(%error, "Failed to initialize rule system");
    }

    let server = RulesHubServer::new(service);

    let running = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    running
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
