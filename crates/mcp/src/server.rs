//! MCP server: JSON-RPC dispatch and the stdio transport.
//!
//! `McpServer` is transport-agnostic. `serve` drives it over any pair of
//! byte streams carrying newline-delimited JSON-RPC; the HTTP transport calls
//! [`McpServer::handle_request`] directly.

use crate::codec::{Frame, LineFramer};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use mcpdemo_core::{
    methods, negotiate_protocol_version, Implementation, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities,
    ToolRequest, ToolsCapability, JSONRPC_VERSION,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    info: Implementation,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, info: Implementation) -> Self {
        Self {
            registry: Arc::new(registry),
            info,
        }
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Unsupported jsonrpc version: {}", request.jsonrpc)),
            ));
        }

        tracing::debug!(method = %request.method, id = %id, "Request received");

        let response = match request.method.as_str() {
            methods::INITIALIZE => match request.parse_params::<InitializeParams>() {
                Ok(params) => JsonRpcResponse::success(id, self.initialize(&params)),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string())),
            },
            methods::PING => JsonRpcResponse::success(id, serde_json::json!({})),
            methods::TOOLS_LIST => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.registry.list_schemas(),
                },
            ),
            methods::TOOLS_CALL => match request.parse_params::<ToolRequest>() {
                Ok(call) => {
                    let name = call.name.clone();
                    match self.registry.call(call).await {
                        Some(result) => JsonRpcResponse::success(id, result),
                        None => JsonRpcResponse::error(
                            id,
                            JsonRpcError::invalid_params(format!("Unknown tool: {}", name)),
                        ),
                    }
                }
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string())),
            },
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };

        Some(response)
    }

    /// Handle one raw line of input.
    pub async fn handle_line(&self, line: &[u8]) -> Option<JsonRpcResponse> {
        match serde_json::from_slice::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
            }
        }
    }

    fn initialize(&self, params: &InitializeParams) -> InitializeResult {
        let version = negotiate_protocol_version(&params.protocol_version);
        tracing::info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            requested = %params.protocol_version,
            negotiated = %version,
            "Client initialized"
        );

        InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
        }
    }

    /// Serve newline-delimited JSON-RPC until `reader` hits end of input.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FramedRead::new(reader, LineFramer::default());
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        while let Some(frame) = frames.next().await {
            let reply = match frame.context("Failed to read message")? {
                Frame::Line(line) if line.trim_ascii().is_empty() => continue,
                Frame::Line(line) => self.handle_line(&line).await,
                Frame::Oversized => {
                    tracing::warn!("Oversized message discarded");
                    Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
                }
            };

            if let Some(response) = reply {
                let encoded =
                    serde_json::to_string(&response).context("Failed to encode response")?;
                sink.send(encoded).await.context("Failed to write response")?;
            }
        }

        tracing::info!("Input closed, stopping");
        Ok(())
    }

    /// Serve on the process's stdin and stdout.
    pub async fn serve_stdio(&self) -> Result<()> {
        tracing::info!(server = %self.info.name, "MCP server running on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}
