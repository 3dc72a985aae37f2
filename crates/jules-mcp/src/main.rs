//! Jules MCP server - exposes the automator as MCP tools over stdio
//!
//! Usage:
//!   jules-mcp [--config <file>] [--verbose]
//!
//! Register it with an MCP client as a stdio server. JULES_API_KEY is
//! required; GITHUB_TOKEN enables `jules_process_reviews`.

use anyhow::{Context, Result};
use clap::Parser;
use jules_agent::{github_token, jules_api_key, SessionClient};
use jules_core::AutomatorConfig;
use jules_mcp::JulesTools;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "jules-mcp")]
#[command(author, version, about = "MCP tool server for Jules sessions and PR review triage")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to .jules/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match cli.config.as_deref() {
        Some(path) => AutomatorConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AutomatorConfig::load_or_default(Path::new("."))
            .context("Failed to load .jules/config.toml")?,
    }
    .with_env_overrides();

    let sessions = SessionClient::new(jules_api_key()?).with_base_url(&config.jules_api_url);
    let mut tools = JulesTools::new(sessions, config);
    match github_token() {
        Ok(token) => tools = tools.with_github_token(token),
        Err(e) => warn!("{}; jules_process_reviews will report an error", e),
    }

    info!("Starting Jules MCP server on stdio");
    let service = tools
        .serve(stdio())
        .await
        .context("Failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}
