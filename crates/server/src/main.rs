//! cairn MCP server entry point.
//!
//! Boots the preview and table-import tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use cairn_core::AppConfig;
use cairn_pipeline::Orchestrator;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let orchestrator = Orchestrator::from_config(config)?;

    tracing::info!("Starting cairn server on stdio transport");

    let handler = handler::CairnServer::new(Arc::new(orchestrator));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
