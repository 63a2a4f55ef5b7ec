// Echo tool

use crate::tools::{json_schema_object, json_schema_string, parse_arguments, Tool};
use anyhow::Result;
use mcpdemo_core::{CallToolResult, ToolSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const ECHO_TOOL: &str = "echotest";

/// Returns its `message` argument unchanged.
#[derive(Debug, Default)]
pub struct EchoTool;

#[derive(Debug, Deserialize)]
struct EchoArgs {
    message: String,
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: ECHO_TOOL.to_string(),
            description: "Echo back the provided message".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "message": json_schema_string("Message to echo back")
                }),
                vec!["message"],
            ),
        }
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<CallToolResult> {
        let args: EchoArgs = parse_arguments(ECHO_TOOL, arguments)?;
        tracing::info!(message = %args.message, "echotest");
        Ok(CallToolResult::text(args.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_echo_returns_message() {
        let result = EchoTool.execute(args(json!({"message": "hello"}))).await.unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.text_content(), "hello");
    }

    #[tokio::test]
    async fn test_echo_keeps_whitespace() {
        let result = EchoTool
            .execute(args(json!({"message": "  spaced  out\n"})))
            .await
            .unwrap();
        assert_eq!(result.text_content(), "  spaced  out\n");
    }

    #[tokio::test]
    async fn test_echo_requires_message() {
        assert!(EchoTool.execute(Map::new()).await.is_err());
    }
}
