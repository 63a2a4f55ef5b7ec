//! # mcpdemo SDK
//!
//! Client for the mcpdemo MCP server over Streamable HTTP, plus the REPL
//! behind `mcpdemo-testclient`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcpdemo_sdk::{McpClient, SdkResult, ToolRequest, ToolSession};
//!
//! #[tokio::main]
//! async fn main() -> SdkResult<()> {
//!     let client = McpClient::builder()
//!         .url("http://localhost:8080/mcp")
//!         .build()?;
//!
//!     let session = client.connect().await?;
//!     for tool in session.list_tools().await? {
//!         println!("{}: {}", tool.name, tool.description);
//!     }
//!
//!     let result = session
//!         .call_tool(ToolRequest::new("timeserver").arg("timezone", "Europe/Kyiv"))
//!         .await?;
//!     println!("{}", result.text_content());
//!
//!     session.close().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod repl;
pub mod session;
pub mod transport;

// Re-export main client
pub use client::{McpClient, McpClientBuilder};
pub use config::{ClientConfig, RetryConfig};
pub use error::{SdkError, SdkResult};
pub use session::{McpSession, ToolSession};

// Re-export core types for convenience
pub use mcpdemo_core::{CallToolResult, Implementation, ToolContent, ToolRequest, ToolSchema};
