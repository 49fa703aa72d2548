pub mod config;
pub mod error;

pub use config::{Config, DeltaThresholds, McpConfig, SnapshotConfig, TimeoutConfig};
pub use error::{Error, Result};
