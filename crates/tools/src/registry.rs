use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use webrelay_core::{Error, Result, TimeoutConfig};

use crate::guard::GuardedTool;
use crate::mcp::provider::McpToolProvider;
use crate::Tool;

/// Name-addressed registry of callable tools. The relay dispatches every
/// remote operation through here.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    /// Register all tools exposed by an MCP server provider, wrapping the
    /// hang-prone ones in a hard timeout guard.
    pub async fn register_provider(&mut self, provider: &McpToolProvider, timeouts: &TimeoutConfig) {
        let mut guarded: Vec<String> = Vec::new();
        for tool in provider.tools().await {
            let name = tool.schema().name.to_string();
            match timeouts.for_tool(&name) {
                Some(secs) => {
                    guarded.push(format!("{}={}s", name, secs));
                    self.register(Arc::new(GuardedTool::new(tool, secs)));
                }
                None => self.register(tool),
            }
        }
        let summary = if guarded.is_empty() {
            "none".to_string()
        } else {
            guarded.join(", ")
        };
        tracing::info!(
            server = %provider.server_name,
            timeouts = %summary,
            "MCP tools registered"
        );
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.tools.clear();
    }

    pub async fn execute(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(params).await
    }
}
