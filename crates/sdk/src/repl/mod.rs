//! Line-oriented interactive client over a [`ToolSession`].

pub mod command;

pub use command::{Command, CommandError};

use crate::session::ToolSession;
use anyhow::{bail, Context, Result};
use mcpdemo_core::ToolRequest;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

pub const PROMPT: &str = "mcp> ";

pub const HELP: &str = "\
Available commands:
  help, h, ?              Show this help message
  list, ls                List available tools
  echo <message>          Test echotest tool
  time [timezone]         Test timeserver tool (e.g., time Europe/Kyiv)
  fetch <url> [max_bytes] Test fetch tool (e.g., fetch https://ifconfig.co/json 1024)
  quit, exit, q           Exit the client";

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    EndOfInput,
}

/// Call a tool and return its text.
///
/// Error-flagged results are failures here, so the REPL and single-command
/// mode report them the same way.
pub async fn call_tool_text(session: &dyn ToolSession, request: ToolRequest) -> Result<String> {
    let name = request.name.clone();
    let result = session
        .call_tool(request)
        .await
        .with_context(|| format!("tool call {} failed", name))?;

    let text = result.text_content();
    if result.is_error {
        bail!("tool returned error: {}", text);
    }
    Ok(text)
}

pub struct Repl<'a, W> {
    session: &'a dyn ToolSession,
    out: W,
}

impl<'a, W: Write> Repl<'a, W> {
    pub fn new(session: &'a dyn ToolSession, out: W) -> Self {
        Self { session, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print_help(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "{}", HELP)
    }

    /// Read commands until `quit` or end of input.
    pub async fn run<R>(&mut self, mut input: R) -> Result<Exit>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut raw = Vec::new();

        loop {
            write!(self.out, "\n{}", PROMPT)?;
            self.out.flush()?;

            raw.clear();
            if input.read_until(b'\n', &mut raw).await? == 0 {
                return Ok(Exit::EndOfInput);
            }

            let Ok(line) = std::str::from_utf8(&raw) else {
                writeln!(self.out, "Error: input is not valid UTF-8")?;
                continue;
            };

            match self.execute(line).await {
                Ok(Some(exit)) => return Ok(exit),
                Ok(None) => {}
                Err(e) => writeln!(self.out, "Error: {:#}", e)?,
            }
        }
    }

    /// Run one line. `Ok(Some(Exit::Quit))` ends the loop.
    pub async fn execute(&mut self, line: &str) -> Result<Option<Exit>> {
        let Some(command) = Command::parse(line.trim())? else {
            return Ok(None);
        };
        debug!(command = ?command, "Dispatching");

        match &command {
            Command::Help => self.print_help()?,
            Command::Quit => {
                writeln!(self.out, "Goodbye!")?;
                return Ok(Some(Exit::Quit));
            }
            Command::List => self.list_tools().await?,
            Command::Echo { message } => {
                writeln!(self.out, "\n=== Calling echotest ===")?;
                writeln!(self.out, "Message: {}", message)?;
            }
            Command::Time { timezone } => {
                writeln!(self.out, "\n=== Calling timeserver ===")?;
                writeln!(
                    self.out,
                    "Timezone: {}",
                    timezone.as_deref().unwrap_or("Local")
                )?;
            }
            Command::Fetch { url, max_bytes } => {
                writeln!(self.out, "\n=== Calling fetch ===")?;
                writeln!(self.out, "URL: {}", url)?;
                if let Some(n) = max_bytes.filter(|n| *n > 0) {
                    writeln!(self.out, "Max bytes: {}", n)?;
                }
            }
        }

        if let Some(request) = command.tool_request() {
            let text = call_tool_text(self.session, request).await?;
            writeln!(self.out, "\n=== Result ===")?;
            writeln!(self.out, "{}", text)?;
        }

        Ok(None)
    }

    async fn list_tools(&mut self) -> Result<()> {
        writeln!(self.out, "\n=== Listing available tools ===")?;

        let tools = self
            .session
            .list_tools()
            .await
            .context("failed to list tools")?;

        if tools.is_empty() {
            writeln!(self.out, "No tools available")?;
            return Ok(());
        }

        for (i, tool) in tools.iter().enumerate() {
            writeln!(self.out, "{}. {}", i + 1, tool.name)?;
            if !tool.description.is_empty() {
                writeln!(self.out, "   Description: {}", tool.description)?;
            }
        }
        Ok(())
    }
}
