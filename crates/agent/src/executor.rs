//! Single-session tool executor.
//!
//! Pure relay: no prompt planning, no LLM inference. The remote planner
//! decides which tool to call; this executor owns the MCP connection, the
//! timeout guards, and the snapshot pipeline for exactly one browser
//! session. `&mut self` on every dispatching method is what enforces the
//! at-most-one-in-flight-call discipline.

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use webrelay_core::{Config, Error, Result};
use webrelay_tools::mcp::{McpClient, McpToolProvider};
use webrelay_tools::snapshot::SnapshotPipeline;
use webrelay_tools::ToolRegistry;

/// The tool whose string output flows through the snapshot pipeline.
const SNAPSHOT_TOOL: &str = "take_snapshot";

pub struct Executor {
    config: Config,
    registry: ToolRegistry,
    pipeline: SnapshotPipeline,
    /// Keeps the MCP client (and its server child process) alive.
    provider: Option<McpToolProvider>,
    connected: bool,
    thread_id: Uuid,
    browser_url: Option<String>,
}

impl Executor {
    pub fn new(config: Config) -> Self {
        let pipeline = SnapshotPipeline::new(config.snapshot.clone());
        Self {
            config,
            registry: ToolRegistry::new(),
            pipeline,
            provider: None,
            connected: false,
            thread_id: Uuid::new_v4(),
            browser_url: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn thread_id(&self) -> Uuid {
        self.thread_id
    }

    /// Launch the MCP server and register its tools, wrapping the
    /// hang-prone ones with hard timeouts. Idempotent while connected.
    pub async fn connect(&mut self, browser_url: Option<&str>) -> Result<()> {
        if self.connected {
            return Ok(());
        }

        let client = McpClient::launch(&self.config.mcp, browser_url).await?;
        let provider = McpToolProvider::new("chrome", client);
        self.registry
            .register_provider(&provider, &self.config.timeouts)
            .await;

        self.provider = Some(provider);
        self.connected = true;
        self.browser_url = browser_url.map(str::to_string);
        info!(
            tools = self.registry.tool_names().len(),
            browser_url = self.browser_url.as_deref().unwrap_or("<managed>"),
            "Executor connected"
        );
        Ok(())
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// Start a fresh logical thread. Snapshot memory is untouched: the
    /// page state didn't change, only the conversation did.
    pub fn clear_history(&mut self) {
        self.thread_id = Uuid::new_v4();
    }

    /// Whether the live connection can serve a request for `browser_url`.
    /// `CHROME_DEBUG_URL` stands in when the caller passes nothing,
    /// matching how the relay's setup payloads behave.
    pub fn is_compatible_config(&self, browser_url: Option<&str>) -> bool {
        let requested = browser_url
            .map(str::to_string)
            .or_else(|| std::env::var("CHROME_DEBUG_URL").ok());
        self.connected && requested == self.browser_url
    }

    /// Dispatch one tool call. Snapshot wrapper options (underscore keys)
    /// are stripped from the args before the remote tool sees them;
    /// `take_snapshot` text output is compacted and delta-diffed on the
    /// way back.
    pub async fn call_tool(&mut self, name: &str, args: Value) -> Result<Value> {
        if !self.connected {
            return Err(Error::Session(
                "Executor not connected. Call connect() first.".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(Error::Validation("Missing tool name".to_string()));
        }

        // Anything that isn't an object is treated as no args at all.
        let mut args = if args.is_object() {
            args
        } else {
            Value::Object(Default::default())
        };
        let opts = self.pipeline.options_from_args(&mut args);

        let result = self.registry.execute(name, args).await?;

        if name == SNAPSHOT_TOOL {
            if let Value::String(text) = &result {
                return Ok(Value::String(self.pipeline.process(text, &opts)));
            }
        }
        Ok(result)
    }

    /// Tear the session down: drop the MCP client (killing the server
    /// child) and discard snapshot memory.
    pub fn close(&mut self) {
        if self.provider.take().is_some() {
            info!("Executor disconnected");
        }
        self.connected = false;
        self.registry.clear();
        self.pipeline.reset();
        self.browser_url = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use webrelay_tools::{Tool, ToolSchema};

    struct FakeSnapshotTool;

    #[async_trait]
    impl Tool for FakeSnapshotTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "take_snapshot",
                description: "static accessibility dump",
                parameters: json!({}),
            }
        }

        async fn execute(&self, params: Value) -> Result<Value> {
            // Wrapper keys must never reach the remote tool.
            let leaked: Vec<&String> = params
                .as_object()
                .map(|m| m.keys().filter(|k| k.starts_with('_')).collect())
                .unwrap_or_default();
            assert!(leaked.is_empty(), "wrapper keys leaked: {leaked:?}");
            Ok(json!("heading Cart\nbutton Checkout\nplain trailing text"))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "click",
                description: "echo",
                parameters: json!({}),
            }
        }

        async fn execute(&self, params: Value) -> Result<Value> {
            Ok(params)
        }
    }

    /// Executor wired to in-process tools instead of a live MCP server.
    fn stub_executor() -> Executor {
        let mut exec = Executor::new(Config::default());
        exec.registry.register(Arc::new(FakeSnapshotTool));
        exec.registry.register(Arc::new(EchoTool));
        exec.connected = true;
        exec.browser_url = Some("stub://test".to_string());
        exec
    }

    #[tokio::test]
    async fn test_call_tool_requires_connection() {
        let mut exec = Executor::new(Config::default());
        let err = exec.call_tool("click", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }

    #[tokio::test]
    async fn test_call_tool_rejects_empty_name() {
        let mut exec = stub_executor();
        let err = exec.call_tool("  ", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_named_failure() {
        let mut exec = stub_executor();
        let err = exec.call_tool("hover", json!({})).await.unwrap_err();
        match err {
            Error::NotFound(msg) => assert!(msg.contains("hover")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_routing_and_wrapper_key_stripping() {
        let mut exec = stub_executor();

        let out = exec
            .call_tool(
                "take_snapshot",
                json!({"_snapshot_level": 2, "_delta": true, "_max_chars": 5000}),
            )
            .await
            .unwrap();
        assert_eq!(
            out.as_str().unwrap(),
            "heading Cart\nbutton Checkout\nplain trailing text"
        );

        // Same page again: the delta engine answers instead of the dump.
        let out = exec
            .call_tool("take_snapshot", json!({"_snapshot_level": 2, "_delta": true}))
            .await
            .unwrap();
        assert_eq!(out.as_str().unwrap(), "[snapshot:delta] no change");
    }

    #[tokio::test]
    async fn test_non_snapshot_results_pass_through() {
        let mut exec = stub_executor();
        let out = exec
            .call_tool("click", json!({"selector": "#go", "_compact": false}))
            .await
            .unwrap();
        // wrapper keys are stripped even for non-snapshot tools
        assert_eq!(out, json!({"selector": "#go"}));
    }

    #[tokio::test]
    async fn test_non_object_args_become_empty() {
        let mut exec = stub_executor();
        let out = exec.call_tool("click", json!("bogus")).await.unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn test_clear_history_rotates_thread() {
        let mut exec = stub_executor();
        let before = exec.thread_id();
        exec.clear_history();
        assert_ne!(before, exec.thread_id());
    }

    #[test]
    fn test_compatibility_requires_connection_and_same_url() {
        let exec = stub_executor();
        assert!(exec.is_compatible_config(Some("stub://test")));
        assert!(!exec.is_compatible_config(Some("http://127.0.0.1:9222")));

        let closed = Executor::new(Config::default());
        assert!(!closed.is_compatible_config(Some("stub://test")));
    }

    #[test]
    fn test_close_clears_session_state() {
        let mut exec = stub_executor();
        assert!(!exec.tool_names().is_empty());
        exec.close();
        assert!(exec.tool_names().is_empty());
        assert!(!exec.is_connected());
    }
}
