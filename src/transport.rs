//! The MCP/LLM-tool transport boundary (spec §6, Design Note §9). The tool
//! implementations themselves are out of scope; this crate only calls them
//! through this interface. Replaces stringly-typed tool names with a tagged
//! variant per the teacher's enum-over-strings idiom seen throughout
//! `domain_router.rs`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tool {
    Scan,
    Analyze,
    Safe,
    Pii,
    Learn,
    Stats,
    Other(String),
}

impl Tool {
    fn as_str(&self) -> &str {
        match self {
            Tool::Scan => "scan",
            Tool::Analyze => "analyze",
            Tool::Safe => "safe",
            Tool::Pii => "pii",
            Tool::Learn => "learn",
            Tool::Stats => "stats",
            Tool::Other(name) => name,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, tool: Tool, args: JsonValue) -> Result<JsonValue>;

    async fn call_text(&self, tool: Tool, args: JsonValue) -> Result<String> {
        let value = self.call(tool, args).await?;
        value
            .as_str()
            .map(str::to_string)
            .or_else(|| value.get("text").and_then(|v| v.as_str()).map(str::to_string))
            .ok_or_else(|| Error::MalformedResponse("expected a text field".into()))
    }

    /// Whether the last call observed a transport failure, for health
    /// reporting via the circuit breaker.
    fn is_healthy(&self) -> bool;
}

/// Default adapter: a single child process speaking newline-delimited JSON
/// over stdio. One request in flight at a time per adapter instance.
pub struct StdioTransport {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    connect_timeout: Duration,
}

impl StdioTransport {
    pub async fn spawn(command: &str, args: &[&str], connect_timeout: Duration) -> Result<Self> {
        let mut child = timeout(connect_timeout, async {
            Command::new(command)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
        })
        .await
        .map_err(|_| Error::TransportTransient(format!("spawn of {command} timed out")))?
        .map_err(|e| Error::TransportTransient(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::TransportTransient("child has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::TransportTransient("child has no stdout".into()))?;

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            connect_timeout,
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn call(&self, tool: Tool, args: JsonValue) -> Result<JsonValue> {
        let request = serde_json::json!({ "tool": tool.as_str(), "args": args });
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| Error::TransportTransient(e.to_string()))?;
            stdin
                .flush()
                .await
                .map_err(|e| Error::TransportTransient(e.to_string()))?;
        }

        let mut response = String::new();
        {
            let mut stdout = self.stdout.lock().await;
            timeout(self.connect_timeout, stdout.read_line(&mut response))
                .await
                .map_err(|_| Error::TransportTransient("read timed out".into()))?
                .map_err(|e| Error::TransportTransient(e.to_string()))?;
        }

        if response.trim().is_empty() {
            return Err(Error::TransportTransient("empty response".into()));
        }
        serde_json::from_str(&response)
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON response: {e}")))
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
