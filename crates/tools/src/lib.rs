pub mod guard;
pub mod mcp;
pub mod registry;
pub mod snapshot;

use async_trait::async_trait;
use serde_json::Value;
use webrelay_core::Result;

pub use registry::ToolRegistry;

/// Truncate a string to at most `max_chars` bytes, respecting UTF-8 char
/// boundaries. Returns a borrowed slice; no allocation.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// A callable operation addressed by name. Remote MCP tools and local
/// wrappers both implement this.
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }
    async fn execute(&self, params: Value) -> Result<Value>;
}
