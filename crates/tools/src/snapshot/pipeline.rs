//! The snapshot pipeline: raw tool output + options in, final text out.

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;
use webrelay_core::SnapshotConfig;

use super::classify::Classifier;
use super::compact::compact;
use super::delta::{build_diff, is_small_change, DeltaMode, DELTA_NO_CHANGE};

pub const TRUNCATED_MARKER: &str = "[snapshot:truncated] true";

/// Effective per-call options after tolerant argument parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub level: u8,
    pub max_chars: usize,
    pub delta: DeltaMode,
}

impl SnapshotOptions {
    /// Pop the underscore-prefixed wrapper keys out of a tool-args object
    /// and resolve them against the configured defaults. The remaining args
    /// are what the remote tool actually receives.
    ///
    /// Parsing is maximally tolerant: these options arrive over a generic
    /// tool-argument channel, so anything malformed falls back to a
    /// documented default instead of failing the call.
    pub fn from_args(args: &mut Value, cfg: &SnapshotConfig) -> Self {
        let (level_raw, compact_raw, delta_raw, max_chars_raw) = match args.as_object_mut() {
            Some(map) => {
                let popped = (
                    map.remove("_snapshot_level"),
                    map.remove("_compact"),
                    map.remove("_delta"),
                    map.remove("_max_chars"),
                );
                // Accepted for forward compatibility, currently unused.
                map.remove("_context_lines");
                map.remove("_keywords");
                popped
            }
            None => (None, None, None, None),
        };

        let compact = compact_raw.as_ref().and_then(Value::as_bool).unwrap_or(true);

        let level = match level_raw {
            None | Some(Value::Null) => {
                if compact {
                    1
                } else {
                    2
                }
            }
            Some(v) => as_int(&v).map(|n| n.clamp(0, 2) as u8).unwrap_or(1),
        };

        let max_chars = match max_chars_raw {
            None | Some(Value::Null) => cfg.tier_max_chars(level),
            Some(v) => as_int(&v)
                .map(|n| n.max(0) as usize)
                .unwrap_or(cfg.max_chars_level1),
        };
        let max_chars = cfg.clamp_max_chars(max_chars);

        let delta = match delta_raw {
            None | Some(Value::Null) => DeltaMode::default(),
            Some(Value::Bool(b)) => DeltaMode::from_flag(Some(b)),
            Some(Value::String(s)) => DeltaMode::parse(&s)
                .unwrap_or_else(|| DeltaMode::from_flag(Some(!s.trim().is_empty()))),
            Some(Value::Number(n)) => DeltaMode::from_flag(Some(n.as_f64().unwrap_or(0.0) != 0.0)),
            Some(_) => DeltaMode::default(),
        };

        Self {
            level,
            max_chars,
            delta,
        }
    }
}

fn as_int(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// The two snapshots remembered between calls. Raw text/hash is tracked
/// for debugging only; the filtered hash is what drives delta decisions.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMemory {
    pub raw_hash: Option<String>,
    pub raw_text: Option<String>,
    pub filtered_hash: Option<String>,
    pub filtered_text: Option<String>,
}

/// Compaction + delta pipeline for one session. Not reentrant: the owner
/// must serialize calls (the executor's `&mut self` does).
pub struct SnapshotPipeline {
    classifier: Classifier,
    config: SnapshotConfig,
    memory: SnapshotMemory,
}

impl SnapshotPipeline {
    pub fn new(config: SnapshotConfig) -> Self {
        Self::with_classifier(config, Classifier::default())
    }

    pub fn with_classifier(config: SnapshotConfig, classifier: Classifier) -> Self {
        Self {
            classifier,
            config,
            memory: SnapshotMemory::default(),
        }
    }

    pub fn options_from_args(&self, args: &mut Value) -> SnapshotOptions {
        SnapshotOptions::from_args(args, &self.config)
    }

    pub fn memory(&self) -> &SnapshotMemory {
        &self.memory
    }

    /// Drop the remembered snapshots (session teardown).
    pub fn reset(&mut self) {
        self.memory = SnapshotMemory::default();
    }

    /// Compact `raw` and apply the delta policy against the previous
    /// filtered snapshot. Memory is updated unconditionally at the end, so
    /// a later call in a different mode sees correct history.
    pub fn process(&mut self, raw: &str, opts: &SnapshotOptions) -> String {
        let raw_hash = sha256_hex(raw);
        let compaction = compact(raw, &self.classifier, opts.level, opts.max_chars);
        let filtered_hash = sha256_hex(&compaction.text);

        debug!(
            level = opts.level,
            max_chars = opts.max_chars,
            delta = ?opts.delta,
            truncated = compaction.truncated,
            "snapshot compacted"
        );

        let prev_hash = self.memory.filtered_hash.as_deref();
        let prev_text = self.memory.filtered_text.as_deref().unwrap_or("");

        let mut out = match opts.delta {
            DeltaMode::Off => compaction.text.clone(),
            _ if prev_hash == Some(filtered_hash.as_str()) => {
                debug!("snapshot delta: no change");
                DELTA_NO_CHANGE.to_string()
            }
            // Nothing to diff against on the first call of a session.
            _ if prev_hash.is_none() => compaction.text.clone(),
            DeltaMode::On => build_diff(prev_text, &compaction.text, self.config.delta.diff_line_cap),
            DeltaMode::Auto => {
                if is_small_change(prev_text, &compaction.text, &self.config.delta) {
                    debug!("snapshot delta: small change, sending diff");
                    build_diff(prev_text, &compaction.text, self.config.delta.diff_line_cap)
                } else {
                    debug!("snapshot delta: large change, sending full text");
                    compaction.text.clone()
                }
            }
        };

        self.memory = SnapshotMemory {
            raw_hash: Some(raw_hash),
            raw_text: Some(raw.to_string()),
            filtered_hash: Some(filtered_hash),
            filtered_text: Some(compaction.text),
        };

        if compaction.truncated {
            out.push('\n');
            out.push_str(TRUNCATED_MARKER);
        }
        out
    }
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
