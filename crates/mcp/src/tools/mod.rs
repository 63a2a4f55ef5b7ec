pub mod echo;
pub mod time;
pub mod web;
mod registry;

use crate::fetch::{FetchError, FetchSettings, Fetcher};
use std::sync::Arc;

pub use echo::EchoTool;
pub use registry::{
    json_schema_integer, json_schema_object, json_schema_string, parse_arguments, Tool,
    ToolRegistry,
};
pub use time::TimeServerTool;
pub use web::WebFetchTool;

/// Registry holding `echotest`, `timeserver` and `fetch`.
pub fn builtin_registry(fetch: &FetchSettings) -> Result<ToolRegistry, FetchError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(TimeServerTool));
    registry.register(Arc::new(WebFetchTool::new(Fetcher::new(fetch)?)));
    Ok(registry)
}
