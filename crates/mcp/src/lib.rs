// MCP tools and server for mcpdemo: echotest, timeserver and a bounded fetch

pub mod codec;
pub mod fetch;
pub mod server;
pub mod tools;

pub use fetch::{FetchConfig, FetchError, FetchSettings, Fetcher};
pub use server::McpServer;
pub use tools::{builtin_registry, Tool, ToolRegistry};
