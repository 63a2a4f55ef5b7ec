use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

mod api;
mod config;
mod sessions;

use config::{AppState, ServerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// Streamable HTTP on /mcp plus health endpoints
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "mcpdemo")]
#[command(about = "Demo MCP server exposing echotest, timeserver and fetch", long_about = None)]
struct Args {
    /// Transport mode
    #[arg(long, value_enum, default_value = "stdio", env = "MCPDEMO_MODE")]
    mode: Mode,

    /// Host to bind to in http mode
    #[arg(long, env = "MCPDEMO_HOST")]
    host: Option<String>,

    /// Port to listen on in http mode
    #[arg(short, long, env = "MCPDEMO_PORT")]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long, default_value = "mcpdemo.toml", env = "MCPDEMO_CONFIG")]
    config: PathBuf,
}

/// Logs always go to stderr: in stdio mode stdout carries protocol traffic.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mcpdemo=info,tower_http=info".into());
    let json = std::env::var("MCPDEMO_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = AppState::new(&config)?;
    tracing::info!(
        service = %config.server.name,
        version = env!("CARGO_PKG_VERSION"),
        mode = ?args.mode,
        "Starting MCP server"
    );

    match args.mode {
        Mode::Stdio => state.mcp.serve_stdio().await?,
        Mode::Http => api::serve(&config.listen_addr(), state).await?,
    }

    Ok(())
}
