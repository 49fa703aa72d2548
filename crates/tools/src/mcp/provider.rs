use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use webrelay_core::Result;

use crate::mcp::client::{McpClient, McpTool};
use crate::{Tool, ToolSchema};

/// A single remote tool exposed as a local `Tool` implementation. Names are
/// kept unqualified so callers address tools exactly as the server names
/// them.
pub struct McpToolWrapper {
    /// Leaked once at construction time; schemas want `&'static str`.
    name: &'static str,
    description: &'static str,
    input_schema: Value,
    client: Arc<McpClient>,
}

impl McpToolWrapper {
    pub fn new(tool: McpTool, client: Arc<McpClient>) -> Self {
        let name: &'static str = Box::leak(tool.name.into_boxed_str());
        let description: &'static str =
            Box::leak(tool.description.unwrap_or_default().into_boxed_str());
        Self {
            name,
            description,
            input_schema: tool.input_schema,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Tool for McpToolWrapper {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name,
            description: self.description,
            parameters: self.input_schema.clone(),
        }
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        debug!(tool = self.name, "Executing MCP tool");
        self.client.call_tool(self.name, params).await
    }
}

/// Holds a running MCP client and hands out wrappers for everything the
/// server advertises.
pub struct McpToolProvider {
    pub server_name: String,
    pub client: Arc<McpClient>,
}

impl McpToolProvider {
    pub fn new(server_name: impl Into<String>, client: McpClient) -> Self {
        Self {
            server_name: server_name.into(),
            client: Arc::new(client),
        }
    }

    pub async fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.client
            .list_tools()
            .await
            .into_iter()
            .map(|t| Arc::new(McpToolWrapper::new(t, self.client.clone())) as Arc<dyn Tool>)
            .collect()
    }
}
