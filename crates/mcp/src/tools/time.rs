// Clock lookup tool

use crate::tools::{json_schema_object, json_schema_string, parse_arguments, Tool};
use anyhow::Result;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use chrono_tz::Tz;
use mcpdemo_core::{CallToolResult, ToolSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const TIME_TOOL: &str = "timeserver";

/// Reports the current time in a requested IANA zone (or the host zone) and UTC.
#[derive(Debug, Default)]
pub struct TimeServerTool;

#[derive(Debug, Deserialize)]
struct TimeArgs {
    #[serde(default)]
    timezone: Option<String>,
}

/// Zone a reading is rendered in.
#[derive(Debug, Clone, PartialEq)]
pub enum Zone {
    /// The host's zone, with its IANA name when the host exposes one.
    Local { name: String },
    Named(Tz),
}

impl Zone {
    /// Resolve a zone name. Blank or absent means the host zone; anything
    /// else must be a valid IANA name.
    pub fn resolve(name: Option<&str>) -> Result<Self, String> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(Self::Local {
                name: iana_time_zone::get_timezone().unwrap_or_else(|_| "Local".to_string()),
            }),
            Some(name) => name
                .parse::<Tz>()
                .map(Self::Named)
                .map_err(|e| format!("invalid timezone {:?}: {}", name, e)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Local { name } => name,
            Self::Named(tz) => tz.name(),
        }
    }

    fn format(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Local { .. } => now
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Nanos, false),
            Self::Named(tz) => now
                .with_timezone(tz)
                .to_rfc3339_opts(SecondsFormat::Nanos, false),
        }
    }
}

/// Render one clock reading in `zone` and UTC.
pub fn render_time(now: DateTime<Utc>, zone: &Zone) -> String {
    format!(
        "now_local={} (tz={})\nnow_utc={}\nunix={}",
        zone.format(now),
        zone.name(),
        now.to_rfc3339_opts(SecondsFormat::Nanos, true),
        now.timestamp()
    )
}

#[async_trait::async_trait]
impl Tool for TimeServerTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TIME_TOOL.to_string(),
            description: "Return current time; optional IANA tz via timezone arg".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "timezone": json_schema_string("IANA timezone, e.g. Europe/Kyiv")
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<CallToolResult> {
        let args: TimeArgs = parse_arguments(TIME_TOOL, arguments)?;

        let zone = match Zone::resolve(args.timezone.as_deref()) {
            Ok(zone) => zone,
            Err(message) => {
                tracing::warn!(error = %message, "timeserver");
                return Ok(CallToolResult::error(message));
            }
        };

        tracing::info!(tz = %zone.name(), "timeserver");
        Ok(CallToolResult::text(render_time(Utc::now(), &zone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn field<'a>(text: &'a str, key: &str) -> &'a str {
        text.lines()
            .find_map(|line| line.strip_prefix(key))
            .and_then(|rest| rest.strip_prefix('='))
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_zone_is_error_result() {
        let args = json!({"timezone": "Not/AZone"}).as_object().cloned().unwrap();
        let result = TimeServerTool.execute(args).await.unwrap();

        assert!(result.is_error);
        assert!(result.text_content().contains("Not/AZone"));
        assert!(result.text_content().starts_with("invalid timezone"));
    }

    #[tokio::test]
    async fn test_local_and_utc_share_instant() {
        let result = TimeServerTool.execute(Map::new()).await.unwrap();
        assert!(!result.is_error);

        let text = result.text_content();
        let local_field = field(&text, "now_local");
        let local_stamp = local_field.split(" (tz=").next().unwrap();
        let local = DateTime::parse_from_rfc3339(local_stamp).unwrap();
        let utc = DateTime::parse_from_rfc3339(field(&text, "now_utc")).unwrap();
        let unix: i64 = field(&text, "unix").parse().unwrap();

        assert_eq!(local.timestamp(), utc.timestamp());
        assert_eq!(unix, utc.timestamp());
        assert!(field(&text, "now_utc").ends_with('Z'));
    }

    #[tokio::test]
    async fn test_empty_zone_means_local() {
        let args = json!({"timezone": ""}).as_object().cloned().unwrap();
        let result = TimeServerTool.execute(args).await.unwrap();
        assert!(!result.is_error);
    }

    #[test]
    fn test_render_named_zone() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let zone = Zone::resolve(Some("Asia/Tokyo")).unwrap();

        assert_eq!(
            render_time(now, &zone),
            "now_local=2024-01-15T21:00:00.000000000+09:00 (tz=Asia/Tokyo)\n\
             now_utc=2024-01-15T12:00:00.000000000Z\n\
             unix=1705320000"
        );
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(
            Zone::resolve(Some("  UTC ")).unwrap(),
            Zone::Named(chrono_tz::UTC)
        );
        assert!(matches!(Zone::resolve(Some("   ")), Ok(Zone::Local { .. })));
    }
}
