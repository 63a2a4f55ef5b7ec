// Web tool: bounded fetch of an http(s) URL

use crate::fetch::{FetchConfig, Fetcher};
use crate::tools::{json_schema_integer, json_schema_object, json_schema_string, parse_arguments, Tool};
use anyhow::Result;
use mcpdemo_core::{CallToolResult, ToolSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const FETCH_TOOL: &str = "fetch";

/// Tool to fetch content from web URLs
pub struct WebFetchTool {
    fetcher: Fetcher,
}

impl WebFetchTool {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[derive(Debug, Deserialize)]
struct WebFetchArgs {
    #[serde(default)]
    url: String,
    #[serde(default)]
    max_bytes: Option<i64>,
}

#[async_trait::async_trait]
impl Tool for WebFetchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: FETCH_TOOL.to_string(),
            description:
                "Fetch content from a URL (HTTP/HTTPS). Optional max_bytes to limit response size"
                    .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "url": json_schema_string("URL to fetch (must be http or https)"),
                    "max_bytes": json_schema_integer("Limit response body bytes (default 4096, min 256, max 65536)")
                }),
                vec!["url"],
            ),
        }
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<CallToolResult> {
        let args: WebFetchArgs = parse_arguments(FETCH_TOOL, arguments)?;

        // Reject before any network I/O
        let config = match FetchConfig::new(&args.url, args.max_bytes) {
            Ok(config) => config,
            Err(e) => return Ok(CallToolResult::error(e.to_string())),
        };

        match self.fetcher.fetch(&config).await {
            Ok(outcome) => {
                tracing::info!(
                    url = %outcome.url,
                    bytes = outcome.bytes_read,
                    truncated = outcome.truncated,
                    "fetch"
                );
                Ok(CallToolResult::text(outcome.render()))
            }
            Err(e) => {
                tracing::error!(url = %config.url(), error = %e, "fetch failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchSettings;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool() -> WebFetchTool {
        WebFetchTool::new(Fetcher::new(&FetchSettings::default()).unwrap())
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = server.uri().replacen("http://", "ftp://", 1);
        let result = tool().execute(args(json!({"url": url}))).await.unwrap();

        assert!(result.is_error);
        assert_eq!(result.text_content(), "URL must start with http:// or https://");
    }

    #[tokio::test]
    async fn test_missing_url() {
        let result = tool().execute(Map::new()).await.unwrap();

        assert!(result.is_error);
        assert_eq!(result.text_content(), "URL is required");
    }

    #[tokio::test]
    async fn test_body_capped_at_max_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a".repeat(5000)))
            .mount(&server)
            .await;

        let result = tool()
            .execute(args(json!({"url": server.uri(), "max_bytes": 1024})))
            .await
            .unwrap();

        assert!(!result.is_error);
        let text = result.text_content();
        let (header, body) = text.split_once("\n\n").unwrap();
        assert!(header.contains("Bytes: 1024 (truncated)"));
        assert_eq!(body.len(), 1024);
    }

    #[tokio::test]
    async fn test_default_cap_applies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b".repeat(10_000)))
            .mount(&server)
            .await;

        let result = tool()
            .execute(args(json!({"url": server.uri(), "max_bytes": 0})))
            .await
            .unwrap();

        let text = result.text_content();
        let (_, body) = text.split_once("\n\n").unwrap();
        assert_eq!(body.len(), 4096);
    }

    #[tokio::test]
    async fn test_network_failure_is_error_result() {
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let result = tool().execute(args(json!({"url": uri}))).await.unwrap();

        assert!(result.is_error);
        assert!(result.text_content().starts_with("Fetch error: "));
    }
}
