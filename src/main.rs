//! Google Workspace MCP Server
//!
//! Serves Gmail, Drive and Calendar tools over stdio, or runs the one-time
//! OAuth consent flow with `auth`.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use google_workspace_mcp::auth::{interactive, Authenticator};
use google_workspace_mcp::config::Config;
use google_workspace_mcp::mcp::{McpServer, ToolDispatcher};

/// Google Workspace MCP Server
#[derive(Parser)]
#[command(name = "google-workspace-mcp")]
#[command(
    author,
    version,
    about = "Google Workspace MCP Server - Gmail, Drive and Calendar over the Model Context Protocol"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with Google (run this first)
    Auth,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::new().context("failed to load configuration")?;
    config.find_and_copy_credentials()?;

    match cli.command {
        Some(Commands::Auth) => {
            interactive::authenticate_interactive(&config)
                .await
                .context("authentication failed")?;
            eprintln!("Authentication completed successfully!");
        }
        None => run_server(config).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    if !config.credentials_exist() {
        tracing::warn!(
            "No {} found; place it in the current directory or {}",
            google_workspace_mcp::config::CREDENTIALS_FILE,
            config.config_dir.display()
        );
    }

    let authenticator = Arc::new(Authenticator::from_config(&config, reqwest::Client::new()));
    let dispatcher = Arc::new(ToolDispatcher::new(authenticator, config));
    dispatcher.warm_up().await;

    tracing::info!("Google Workspace MCP server running on stdio");
    let mut server = McpServer::new(dispatcher);
    server.run_stdio().await?;

    Ok(())
}
