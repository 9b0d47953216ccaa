//! webshot: scroll-capture-stitch screenshot MCP server
//!
//! Connects to a WebDriver server and serves capture and comparison tools
//! over stdio.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use webshot::{
    capture::{WebDriverBackend, constants},
    mcp::WebshotMcpServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP protocol.
    // Respects RUST_LOG, default level: info
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webshot=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();

    info!("webshot server starting...");
    info!("Protocol: Model Context Protocol (MCP)");
    info!("Transport: stdio");

    let endpoint = constants::webdriver_url();
    let driver = WebDriverBackend::connect(&endpoint)
        .await
        .with_context(|| format!("no WebDriver session at {endpoint}"))?;
    info!(endpoint = %endpoint, "Browser driver initialized");

    let output_dir = constants::screenshot_dir();
    let server = WebshotMcpServer::new(Arc::new(driver.clone())).with_output_dir(&output_dir);
    info!(output_dir = %output_dir, "Screenshot folder configured");

    let service = server.serve(stdio()).await?;

    info!("webshot server initialized successfully");
    info!("Server info: {:?}", service.peer_info());
    info!("Waiting for MCP requests...");

    service.waiting().await?;

    info!("webshot server shutting down");
    driver.close().await?;
    Ok(())
}
