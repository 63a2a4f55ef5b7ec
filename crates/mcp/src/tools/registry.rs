// Tool capability and the registry the server dispatches through

use anyhow::{Context, Result};
use mcpdemo_core::{CallToolResult, ToolRequest, ToolSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments.
    ///
    /// Failures the caller should see go in an error-flagged result. An `Err`
    /// is turned into one by the registry.
    async fn execute(&self, arguments: Map<String, Value>) -> Result<CallToolResult>;
}

/// Tool registry for managing available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        self.tools.insert(schema.name, tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tool schemas, sorted by name
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool. `None` means no tool has that name.
    pub async fn call(&self, request: ToolRequest) -> Option<CallToolResult> {
        let tool = self.get(&request.name)?;

        let result = match tool.execute(request.arguments).await {
            Ok(result) => result,
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::warn!(tool = %request.name, error = %message, "Tool call rejected");
                CallToolResult::error(message)
            }
        };

        Some(result)
    }
}

/// Deserialize a tool's argument map into its typed form.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(arguments))
        .with_context(|| format!("Invalid arguments for {}", tool))
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> Value {
    serde_json::json!({
        "type": "integer",
        "description": description
    })
}
