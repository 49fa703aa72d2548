//! JSON-RPC 2.0 stdio client for the `chrome-devtools-mcp` server.
//!
//! The server is launched through npx and keeps one stateful session per
//! client; snapshot refs (@e1, @e2, ...) are only stable within a session,
//! so the child process lives for the lifetime of this client.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, warn};
use webrelay_core::{Error, McpConfig, Result};

#[derive(Debug, Serialize)]
struct Request {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<u64>,
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// A tool as advertised by `tools/list`. Names are unqualified; the
/// executor addresses them exactly as the server names them
/// (`take_snapshot`, `click`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>>>;

pub struct McpClient {
    stdin: Arc<Mutex<ChildStdin>>,
    next_id: AtomicU64,
    pending: PendingMap,
    tools: Mutex<Vec<McpTool>>,
    _child: Child,
}

/// Resolve the launcher binary: explicit config beats `MCP_NPX_COMMAND`
/// beats whatever `npx` PATH lookup finds.
fn resolve_launcher(cfg: &McpConfig) -> Result<String> {
    if let Some(cmd) = &cfg.command {
        return Ok(cmd.clone());
    }
    if let Ok(cmd) = std::env::var("MCP_NPX_COMMAND") {
        if !cmd.trim().is_empty() {
            return Ok(cmd);
        }
    }
    which::which("npx")
        .map(|p| p.display().to_string())
        .map_err(|_| {
            Error::Config(
                "Cannot find 'npx' in PATH. Install Node.js (which provides npx), \
                 or set MCP_NPX_COMMAND."
                    .to_string(),
            )
        })
}

impl McpClient {
    /// Launch the devtools MCP server and run the initialization handshake.
    /// `browser_url` attaches to an already-running Chrome debug endpoint
    /// instead of letting the server spawn its own.
    pub async fn launch(cfg: &McpConfig, browser_url: Option<&str>) -> Result<Self> {
        let launcher = resolve_launcher(cfg)?;
        let mut args = vec!["-y".to_string(), cfg.package.clone()];
        if let Some(url) = browser_url {
            args.push(format!("--browser-url={}", url));
        }

        debug!(launcher = %launcher, package = %cfg.package, "Spawning MCP server");
        let mut child = Command::new(&launcher)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Tool(format!("MCP: failed to spawn '{}': {}", launcher, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Tool("MCP: no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Tool("MCP: no stdout".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(Self::reader_task(stdout, pending.clone()));

        let client = Self {
            stdin: Arc::new(Mutex::new(stdin)),
            next_id: AtomicU64::new(1),
            pending,
            tools: Mutex::new(Vec::new()),
            _child: child,
        };

        client.initialize().await?;
        client.refresh_tools().await?;
        Ok(client)
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Tool(format!("MCP: write error: {}", e)))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| Error::Tool(format!("MCP: write error: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::Tool(format!("MCP: flush error: {}", e)))?;
        Ok(())
    }

    /// Send one request and wait for its response.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = Request {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let line = serde_json::to_string(&req)?;
        debug!(id, method, "MCP request");
        self.write_line(&line).await?;

        rx.await
            .map_err(|_| Error::Tool("MCP: server closed".to_string()))?
            .map_err(Error::Tool)
    }

    async fn initialize(&self) -> Result<()> {
        let result = self
            .call(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {
                        "name": "webrelay",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await?;
        debug!(?result, "MCP initialized");

        // Fire-and-forget notification, no id.
        let notif = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        self.write_line(&notif.to_string()).await.ok();
        Ok(())
    }

    /// Fetch tools/list and cache it.
    pub async fn refresh_tools(&self) -> Result<()> {
        let result = self.call("tools/list", None).await?;
        let tools: Vec<McpTool> = serde_json::from_value(
            result.get("tools").cloned().unwrap_or(Value::Array(vec![])),
        )
        .map_err(|e| Error::Tool(format!("MCP: parse tools: {}", e)))?;
        debug!(count = tools.len(), "MCP tools loaded");
        *self.tools.lock().await = tools;
        Ok(())
    }

    pub async fn list_tools(&self) -> Vec<McpTool> {
        self.tools.lock().await.clone()
    }

    /// Call tools/call. Text content blocks are joined into a single string
    /// result so snapshot output arrives as one `Value::String`.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Value> {
        let result = self
            .call(
                "tools/call",
                Some(serde_json::json!({
                    "name": tool_name,
                    "arguments": arguments
                })),
            )
            .await?;

        if result.get("isError").and_then(|v| v.as_bool()) == Some(true) {
            let msg = first_text(&result).unwrap_or("MCP tool returned an error");
            return Err(Error::Tool(msg.to_string()));
        }

        let content = result.get("content").cloned().unwrap_or(Value::Null);
        if let Some(arr) = content.as_array() {
            let text: Vec<&str> = arr
                .iter()
                .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
                .collect();
            if !text.is_empty() {
                return Ok(Value::String(text.join("\n")));
            }
        }
        Ok(content)
    }

    /// Reader loop: dispatch responses by id to waiting callers; fail all
    /// waiters when the server's stdout closes.
    async fn reader_task(stdout: ChildStdout, pending: PendingMap) {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    debug!("MCP <- {}", crate::safe_truncate(&line, 200));
                    match serde_json::from_str::<Response>(&line) {
                        Ok(resp) => {
                            // Notifications carry no id and are ignored.
                            let Some(id) = resp.id else { continue };
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let payload = match resp.error {
                                    Some(err) => {
                                        Err(format!("JSON-RPC error {}: {}", err.code, err.message))
                                    }
                                    None => Ok(resp.result.unwrap_or(Value::Null)),
                                };
                                let _ = tx.send(payload);
                            }
                        }
                        Err(e) => warn!("MCP: failed to parse response: {}", e),
                    }
                }
                Ok(Some(_)) => {} // blank line
                Ok(None) => {
                    error!("MCP: stdout closed");
                    for (_, tx) in pending.lock().await.drain() {
                        let _ = tx.send(Err("MCP server stdout closed".to_string()));
                    }
                    break;
                }
                Err(e) => {
                    error!("MCP: read error: {}", e);
                    break;
                }
            }
        }
    }
}

fn first_text(result: &Value) -> Option<&str> {
    result
        .get("content")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
}
