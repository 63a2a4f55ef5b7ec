//! An initialized MCP session and the tool-calling seam the REPL drives.

use crate::error::{SdkError, SdkResult};
use crate::transport::{HttpTransport, SessionHeaders};
use async_trait::async_trait;
use mcpdemo_core::{
    methods, CallToolResult, Implementation, ListToolsResult, ToolRequest, ToolSchema,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tracing::{debug, info};

/// Anything that can list and invoke tools on behalf of a caller.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// List the tools the server exposes.
    async fn list_tools(&self) -> SdkResult<Vec<ToolSchema>>;

    /// Invoke one tool. Tool-level failures come back error-flagged, not as `Err`.
    async fn call_tool(&self, request: ToolRequest) -> SdkResult<CallToolResult>;

    /// End the session. Calling it again is a no-op.
    async fn close(&self) -> SdkResult<()>;
}

/// A live session on a Streamable HTTP endpoint.
#[derive(Debug)]
pub struct McpSession {
    transport: HttpTransport,
    headers: SessionHeaders,
    server_info: Implementation,
    next_id: AtomicI64,
    closed: AtomicBool,
}

impl McpSession {
    pub(crate) fn new(
        transport: HttpTransport,
        headers: SessionHeaders,
        server_info: Implementation,
    ) -> Self {
        Self {
            transport,
            headers,
            server_info,
            // id 0 went to `initialize`
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Session id assigned by the server, if it assigned one.
    pub fn session_id(&self) -> Option<&str> {
        self.headers.session_id.as_deref()
    }

    /// Protocol revision agreed during `initialize`.
    pub fn protocol_version(&self) -> Option<&str> {
        self.headers.protocol_version.as_deref()
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and decode its result.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> SdkResult<T> {
        if self.is_closed() {
            return Err(SdkError::SessionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = mcpdemo_core::JsonRpcRequest::new(id, method, params)?;
        debug!(id = id, method = %method, "Sending request");

        let reply = self.transport.send(&request, &self.headers).await?;
        let response = reply
            .response
            .ok_or_else(|| SdkError::InvalidResponse(format!("{} was not answered", method)))?;

        Ok(response.into_result()?)
    }
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&self) -> SdkResult<Vec<ToolSchema>> {
        let result: ListToolsResult = self.request(methods::TOOLS_LIST, json!({})).await?;
        Ok(result.tools)
    }

    async fn call_tool(&self, request: ToolRequest) -> SdkResult<CallToolResult> {
        self.request(methods::TOOLS_CALL, &request).await
    }

    async fn close(&self) -> SdkResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.headers.session_id.is_none() {
            return Ok(());
        }

        self.transport.terminate(&self.headers).await?;
        info!(session_id = ?self.session_id(), "Session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, RetryConfig};
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(server: &MockServer) -> McpSession {
        let mut config = ClientConfig::new(Url::parse(&format!("{}/mcp", server.uri())).unwrap());
        config.retry_config = RetryConfig::no_retry();
        session_with(config)
    }

    fn session_with(config: ClientConfig) -> McpSession {
        let transport = HttpTransport::new(Arc::new(config)).unwrap();
        let headers = SessionHeaders {
            session_id: Some("sess-1".to_string()),
            protocol_version: Some("2025-06-18".to_string()),
        };
        McpSession::new(transport, headers, Implementation::new("mcpdemo", "0.1.0"))
    }

    #[tokio::test]
    async fn test_call_tool_sends_params_and_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("mcp-session-id", "sess-1"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": {"name": "echotest", "arguments": {"message": "hi"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"content": [{"type": "text", "text": "hi"}], "isError": false}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let result = session
            .call_tool(ToolRequest::new("echotest").arg("message", "hi"))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.text_content(), "hi");
    }

    #[tokio::test]
    async fn test_timed_out_call_runs_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/call"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(300))
                    .set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": {"content": [{"type": "text", "text": "late"}]}
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut config = ClientConfig::new(Url::parse(&format!("{}/mcp", server.uri())).unwrap());
        config.timeout = Duration::from_millis(100);
        config.retry_config = RetryConfig::default();
        let session = session_with(config);

        let request = ToolRequest::new("fetch").arg("url", "https://example.com");
        assert!(session.call_tool(request).await.is_err());
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32602, "message": "Unknown tool: nope"}
            })))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let err = session.call_tool(ToolRequest::new("nope")).await.unwrap_err();

        assert!(err.to_string().contains("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn test_list_tools() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"tools": [
                    {"name": "echotest", "description": "Echo", "inputSchema": {"type": "object"}}
                ]}
            })))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let tools = session.list_tools().await.unwrap();

        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echotest");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(header("mcp-session-id", "sess-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session.close().await.unwrap();
        session.close().await.unwrap();

        assert!(session.is_closed());
        assert!(matches!(
            session.list_tools().await,
            Err(SdkError::SessionClosed)
        ));
    }
}
