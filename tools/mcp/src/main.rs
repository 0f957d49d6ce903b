//! tubeup MCP server
//!
//! Run with: tubeup-mcp (reads TUBEUP_* variables and an optional .env)

use anyhow::Context;
use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tubeup_api::YouTubeClient;
use tubeup_auth::{AuthConfig, Authenticator};
use tubeup_mcp::{TubeupService, YouTubeTools};
use tubeup_upload::UploadConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AuthConfig::from_env().context("Invalid TUBEUP_* configuration")?;
    let client = YouTubeClient::with_defaults().context("Failed to create YouTube client")?;

    let tools = YouTubeTools::new(
        Arc::new(Authenticator::new(config)),
        Arc::new(client),
        UploadConfig::default(),
    );

    let service = TubeupService::new(tools);
    let running = service.serve(stdio()).await.context("MCP transport failed")?;
    running.waiting().await.context("MCP server error")?;

    Ok(())
}
