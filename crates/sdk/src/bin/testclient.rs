use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use mcpdemo_sdk::repl::{self, Repl};
use mcpdemo_sdk::{McpClient, McpSession, ToolRequest, ToolSession};
use serde_json::{Map, Value};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mcpdemo-testclient")]
#[command(about = "Test client for the mcpdemo MCP server", long_about = None)]
#[command(after_help = "Examples:
  Interactive mode: mcpdemo-testclient -i --url http://localhost:8080/mcp
  Single command:   mcpdemo-testclient --tool timeserver --args '{\"timezone\":\"Europe/Kyiv\"}'")]
struct Args {
    /// MCP server Streamable HTTP endpoint URL
    #[arg(long, default_value = "http://localhost:8080/mcp", env = "MCPDEMO_URL")]
    url: String,

    /// Request timeout (e.g. 30s, 2m)
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Interactive mode (REPL)
    #[arg(short, long)]
    interactive: bool,

    /// Tool name to call (echotest, timeserver, fetch)
    #[arg(long)]
    tool: Option<String>,

    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    args: String,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mcpdemo=warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn connect(args: &Args) -> Result<McpSession> {
    println!("Connecting to {}...", args.url);

    let client = McpClient::builder()
        .url(&args.url)
        .timeout(args.timeout)
        .build()
        .context("invalid client configuration")?;

    client.connect().await.context("Failed to connect")
}

async fn run_interactive(args: &Args) -> Result<()> {
    println!(
        "MCP Test Client v{} - Interactive Mode",
        env!("CARGO_PKG_VERSION")
    );
    let session = connect(args).await?;
    println!("Connected successfully!");
    println!();

    let mut repl = Repl::new(&session, std::io::stdout());
    repl.print_help()?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = repl.run(stdin).await;

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close session");
    }
    outcome.map(|_| ())
}

async fn run_single(args: &Args, tool: &str) -> Result<()> {
    let arguments: Map<String, Value> =
        serde_json::from_str(&args.args).context("Failed to parse arguments")?;

    let session = connect(args).await?;
    let outcome = repl::call_tool_text(&session, ToolRequest::with_arguments(tool, arguments)).await;

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close session");
    }

    let text = outcome?;
    println!("\n=== Result ===");
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let outcome = if args.interactive {
        run_interactive(&args).await
    } else if let Some(ref tool) = args.tool {
        run_single(&args, tool).await
    } else {
        println!("MCP Test Client");
        println!();
        let _ = Args::command().print_help();
        return ExitCode::SUCCESS;
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
