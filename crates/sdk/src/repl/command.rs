//! REPL command parsing.

use mcpdemo_core::ToolRequest;

pub const ECHO_TOOL: &str = "echotest";
pub const TIME_TOOL: &str = "timeserver";
pub const FETCH_TOOL: &str = "fetch";

/// One line of REPL input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Echo { message: String },
    Time { timezone: Option<String> },
    Fetch { url: String, max_bytes: Option<i64> },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0} (type 'help' for available commands)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parse a line. Blank input yields `Ok(None)`.
    ///
    /// The command word is case-insensitive; arguments are kept as typed.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = parts.collect();

        let command = match word.to_lowercase().as_str() {
            "help" | "h" | "?" => Self::Help,
            "list" | "ls" => Self::List,
            "quit" | "exit" | "q" => Self::Quit,
            "echo" | "echotest" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("echo <message>"));
                }
                Self::Echo {
                    message: rest.join(" "),
                }
            }
            "time" | "timeserver" => Self::Time {
                timezone: rest.first().map(|s| s.to_string()),
            },
            "fetch" => {
                let Some(url) = rest.first() else {
                    return Err(CommandError::Usage("fetch <url> [max_bytes]"));
                };
                let max_bytes = match rest.get(1) {
                    Some(raw) => Some(
                        raw.parse::<i64>()
                            .map_err(|_| CommandError::Usage("fetch <url> [max_bytes]"))?,
                    ),
                    None => None,
                };
                Self::Fetch {
                    url: url.to_string(),
                    max_bytes,
                }
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }

    /// The tool invocation this command stands for, if it is a tool command.
    pub fn tool_request(&self) -> Option<ToolRequest> {
        match self {
            Self::Echo { message } => {
                Some(ToolRequest::new(ECHO_TOOL).arg("message", message.as_str()))
            }
            Self::Time { timezone } => {
                let request = ToolRequest::new(TIME_TOOL);
                Some(match timezone {
                    Some(zone) => request.arg("timezone", zone.as_str()),
                    None => request,
                })
            }
            Self::Fetch { url, max_bytes } => {
                let request = ToolRequest::new(FETCH_TOOL).arg("url", url.as_str());
                Some(match max_bytes {
                    Some(n) => request.arg("max_bytes", *n),
                    None => request,
                })
            }
            Self::Help | Self::List | Self::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("   \t ").unwrap(), None);
    }

    #[test]
    fn test_aliases_case_insensitive() {
        for word in ["help", "H", "?"] {
            assert_eq!(Command::parse(word).unwrap(), Some(Command::Help));
        }
        for word in ["LIST", "ls"] {
            assert_eq!(Command::parse(word).unwrap(), Some(Command::List));
        }
        for word in ["quit", "Exit", "q"] {
            assert_eq!(Command::parse(word).unwrap(), Some(Command::Quit));
        }
    }

    #[test]
    fn test_echo_rejoins_tokens() {
        let command = Command::parse("echo  hi   there").unwrap().unwrap();
        assert_eq!(
            command,
            Command::Echo {
                message: "hi there".to_string()
            }
        );

        let request = command.tool_request().unwrap();
        assert_eq!(request.name, "echotest");
        assert_eq!(request.arguments["message"], json!("hi there"));
    }

    #[test]
    fn test_echo_needs_message() {
        assert_eq!(
            Command::parse("echotest").unwrap_err(),
            CommandError::Usage("echo <message>")
        );
    }

    #[test]
    fn test_time_zone_optional() {
        let local = Command::parse("time").unwrap().unwrap().tool_request().unwrap();
        assert_eq!(local.name, "timeserver");
        assert!(local.arguments.is_empty());

        let kyiv = Command::parse("timeserver Europe/Kyiv")
            .unwrap()
            .unwrap()
            .tool_request()
            .unwrap();
        assert_eq!(kyiv.arguments["timezone"], json!("Europe/Kyiv"));
    }

    #[test]
    fn test_fetch_arguments() {
        let request = Command::parse("fetch https://example.com 1024")
            .unwrap()
            .unwrap()
            .tool_request()
            .unwrap();
        assert_eq!(request.name, "fetch");
        assert_eq!(request.arguments["url"], json!("https://example.com"));
        assert_eq!(request.arguments["max_bytes"], json!(1024));

        let bare = Command::parse("fetch https://example.com")
            .unwrap()
            .unwrap()
            .tool_request()
            .unwrap();
        assert!(!bare.arguments.contains_key("max_bytes"));
    }

    #[test]
    fn test_fetch_usage_errors() {
        assert!(matches!(Command::parse("fetch"), Err(CommandError::Usage(_))));
        assert!(matches!(
            Command::parse("fetch https://example.com lots"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("Frobnicate now").unwrap_err();
        assert_eq!(err, CommandError::Unknown("frobnicate".to_string()));
        assert!(err.to_string().contains("type 'help'"));
    }

    #[test]
    fn test_non_tool_commands() {
        assert!(Command::Help.tool_request().is_none());
        assert!(Command::List.tool_request().is_none());
        assert!(Command::Quit.tool_request().is_none());
    }
}
