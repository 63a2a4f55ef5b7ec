//! Main client for the mcpdemo SDK.

use crate::config::{default_client_info, ClientConfig, RetryConfig};
use crate::error::{SdkError, SdkResult};
use crate::session::McpSession;
use crate::transport::{HttpTransport, SessionHeaders};
use mcpdemo_core::{
    methods, Implementation, InitializeParams, InitializeResult, JsonRpcRequest,
    LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Client for one MCP Streamable HTTP endpoint.
#[derive(Clone)]
pub struct McpClient {
    config: Arc<ClientConfig>,
    http: HttpTransport,
}

impl McpClient {
    /// Create a new client builder.
    pub fn builder() -> McpClientBuilder {
        McpClientBuilder::new()
    }

    /// Create a client from configuration.
    fn from_config(config: ClientConfig) -> SdkResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run the `initialize` handshake and open a session.
    pub async fn connect(&self) -> SdkResult<McpSession> {
        let params = InitializeParams {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: self.config.client_info.clone(),
        };
        let request = JsonRpcRequest::new(0, methods::INITIALIZE, &params)?;

        let reply = self
            .http
            .send_with_retry(&request, &SessionHeaders::default())
            .await?;
        let response = reply
            .response
            .ok_or_else(|| SdkError::InvalidResponse("initialize was not answered".to_string()))?;
        let result: InitializeResult = response.into_result()?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            return Err(SdkError::UnsupportedProtocol(result.protocol_version));
        }

        let headers = SessionHeaders {
            session_id: reply.session_id,
            protocol_version: Some(result.protocol_version.clone()),
        };
        self.http
            .send(&JsonRpcRequest::notification(methods::INITIALIZED), &headers)
            .await?;

        info!(
            url = %self.config.url,
            server = %result.server_info.name,
            server_version = %result.server_info.version,
            protocol = %result.protocol_version,
            session_id = ?headers.session_id,
            "Connected"
        );

        Ok(McpSession::new(self.http.clone(), headers, result.server_info))
    }
}

/// Builder for creating an McpClient.
pub struct McpClientBuilder {
    url: Option<String>,
    timeout: Duration,
    retry_config: RetryConfig,
    client_info: Implementation,
}

impl McpClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
            client_info: default_client_info(),
        }
    }

    /// Set the server endpoint, e.g. `http://localhost:8080/mcp`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set the name and version announced during `initialize`.
    pub fn client_info(mut self, info: Implementation) -> Self {
        self.client_info = info;
        self
    }

    /// Build the client.
    pub fn build(self) -> SdkResult<McpClient> {
        let url_str = self
            .url
            .ok_or_else(|| SdkError::Config("url is required".to_string()))?;

        let url = Url::parse(&url_str)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SdkError::Config(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        let config = ClientConfig {
            url,
            timeout: self.timeout,
            retry_config: self.retry_config,
            client_info: self.client_info,
        };

        McpClient::from_config(config)
    }
}

impl Default for McpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
