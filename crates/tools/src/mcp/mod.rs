//! Tool source: a `chrome-devtools-mcp` server spoken to over stdio.

pub mod client;
pub mod provider;

pub use client::{McpClient, McpTool};
pub use provider::McpToolProvider;
