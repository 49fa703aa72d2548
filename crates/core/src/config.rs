use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Thresholds governing when the `auto` delta mode judges a change "small"
/// enough to send as a structural diff instead of the full snapshot.
///
/// The defaults are empirically tuned; treat them as configuration, not as
/// values to re-derive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaThresholds {
    /// Maximum added+removed line count for a diff to be worthwhile.
    #[serde(default = "default_max_changed_lines")]
    pub max_changed_lines: usize,
    /// Maximum changed/total line fraction.
    #[serde(default = "default_max_changed_fraction")]
    pub max_changed_fraction: f64,
    /// Minimum character-level similarity ratio between old and new text.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    /// Cap on lines emitted per `[added]`/`[removed]` block.
    #[serde(default = "default_diff_line_cap")]
    pub diff_line_cap: usize,
}

fn default_max_changed_lines() -> usize {
    60
}

fn default_max_changed_fraction() -> f64 {
    0.12
}

fn default_min_similarity() -> f64 {
    0.85
}

fn default_diff_line_cap() -> usize {
    200
}

impl Default for DeltaThresholds {
    fn default() -> Self {
        Self {
            max_changed_lines: default_max_changed_lines(),
            max_changed_fraction: default_max_changed_fraction(),
            min_similarity: default_min_similarity(),
            diff_line_cap: default_diff_line_cap(),
        }
    }
}

/// Snapshot compaction defaults. `max_chars` requests are clamped into
/// `[min_max_chars, max_max_chars]`; when the caller does not pass a budget,
/// the per-level tier applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    #[serde(default = "default_level")]
    pub default_level: u8,
    #[serde(default = "default_max_chars_level0")]
    pub max_chars_level0: usize,
    #[serde(default = "default_max_chars_level1")]
    pub max_chars_level1: usize,
    #[serde(default = "default_max_chars_level2")]
    pub max_chars_level2: usize,
    #[serde(default = "default_min_max_chars")]
    pub min_max_chars: usize,
    #[serde(default = "default_max_max_chars")]
    pub max_max_chars: usize,
    #[serde(default)]
    pub delta: DeltaThresholds,
}

fn default_level() -> u8 {
    1
}

fn default_max_chars_level0() -> usize {
    6000
}

fn default_max_chars_level1() -> usize {
    12000
}

fn default_max_chars_level2() -> usize {
    20000
}

fn default_min_max_chars() -> usize {
    2000
}

fn default_max_max_chars() -> usize {
    80000
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            max_chars_level0: default_max_chars_level0(),
            max_chars_level1: default_max_chars_level1(),
            max_chars_level2: default_max_chars_level2(),
            min_max_chars: default_min_max_chars(),
            max_max_chars: default_max_max_chars(),
            delta: DeltaThresholds::default(),
        }
    }
}

impl SnapshotConfig {
    /// Default char budget for a detail level (0 = most aggressive).
    pub fn tier_max_chars(&self, level: u8) -> usize {
        match level {
            0 => self.max_chars_level0,
            1 => self.max_chars_level1,
            _ => self.max_chars_level2,
        }
    }

    /// Clamp a requested char budget into the allowed window.
    pub fn clamp_max_chars(&self, requested: usize) -> usize {
        requested.clamp(self.min_max_chars, self.max_max_chars)
    }
}

/// Hard wall-clock bounds for hang-prone tools. Tools not listed here run
/// undecorated. Seconds, per tool name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_secs")]
    pub default_secs: u64,
    #[serde(default = "default_per_tool")]
    pub per_tool: HashMap<String, u64>,
}

fn default_timeout_secs() -> u64 {
    env_secs("TOOL_TIMEOUT_SECONDS", 20)
}

fn default_per_tool() -> HashMap<String, u64> {
    HashMap::from([
        ("click".to_string(), env_secs("CLICK_TIMEOUT_SECONDS", 5)),
        ("fill".to_string(), env_secs("FILL_TIMEOUT_SECONDS", 8)),
        ("fill_form".to_string(), env_secs("FILL_FORM_TIMEOUT_SECONDS", 12)),
        ("press_key".to_string(), env_secs("PRESS_KEY_TIMEOUT_SECONDS", 8)),
        ("navigate_page".to_string(), env_secs("NAVIGATE_TIMEOUT_SECONDS", 15)),
    ])
}

/// Read an integer number of seconds from the environment, falling back on
/// the default when unset or unparseable.
fn env_secs(var: &str, fallback: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: default_timeout_secs(),
            per_tool: default_per_tool(),
        }
    }
}

impl TimeoutConfig {
    /// Wall-clock bound for a tool, if it is one of the guarded ones.
    pub fn for_tool(&self, name: &str) -> Option<u64> {
        self.per_tool.get(name).copied()
    }
}

/// How to launch the MCP server that exposes the browser tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConfig {
    /// Explicit launcher command. When unset, `MCP_NPX_COMMAND` is consulted
    /// and then `npx` is resolved from PATH.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_mcp_package")]
    pub package: String,
}

fn default_mcp_package() -> String {
    "chrome-devtools-mcp@latest".to_string()
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            command: None,
            package: default_mcp_package(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

impl Config {
    /// Defaults plus environment overrides. The env table matches the
    /// deployed relay so existing setups keep working.
    pub fn from_env() -> Self {
        Self::default()
    }
}
