//! chatdock — run a session title gateway from the terminal
//!
//! Usage:
//!   chatdock serve [--session-id <id>] [--config <file.toml>]
//!   chatdock tools
//!
//! `serve` prints one JSON line with the gateway URL, then one JSON line per
//! message delivered to the session. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use chatdock_core::session::ChannelSessionClient;
use chatdock_mcp::gateway::title_registry;
use chatdock_mcp::{GatewayConfig, McpToolAdapter, TitleGateway};

#[derive(Parser)]
#[command(name = "chatdock", version, about = "Local MCP gateway for renaming chat sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a gateway and print delivered session messages
    Serve {
        /// Session the gateway acts for (random if omitted)
        #[arg(long)]
        session_id: Option<String>,
        /// TOML file with gateway settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the tools the gateway exposes
    Tools,
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let Some(path) = path else {
        return Ok(GatewayConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

async fn serve(session_id: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let (client, mut messages) = ChannelSessionClient::new(session_id.clone());

    let handle = TitleGateway::new(Arc::new(client))
        .with_config(config)
        .start()
        .await?;

    println!(
        "{}",
        serde_json::json!({
            "sessionId": session_id,
            "url": handle.url(),
            "toolNames": handle.tool_names(),
        })
    );

    loop {
        tokio::select! {
            Some(message) = messages.recv() => {
                println!("{}", serde_json::to_string(&message)?);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping gateway");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn print_tools() -> Result<()> {
    let (client, _messages) = ChannelSessionClient::new("tools");
    let adapter = McpToolAdapter::new(title_registry(Arc::new(client)));
    println!("{}", serde_json::to_string_pretty(&adapter.list_tools())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { session_id, config } => serve(session_id, config).await,
        Command::Tools => print_tools(),
    }
}
