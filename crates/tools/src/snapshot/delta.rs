//! Structural delta between consecutive filtered snapshots.
//!
//! The diff is line-set based: a line is "added" when it exists in the new
//! text and not in the old one, "removed" in the opposite case. Reordered
//! but identical lines therefore count as unchanged, which is the right
//! trade for accessibility dumps where ordering jitter is common.

use std::collections::HashSet;

use similar::TextDiff;
use webrelay_core::DeltaThresholds;

pub const DELTA_NO_CHANGE: &str = "[snapshot:delta] no change";
pub const DELTA_CHANGED: &str = "[snapshot:delta] changed";
const ADDED_MARKER: &str = "[added]";
const REMOVED_MARKER: &str = "[removed]";

/// Diffing policy for consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaMode {
    /// Bypass diffing entirely (memory still updates).
    Off,
    /// Always diff against the previous filtered snapshot.
    On,
    /// Diff only when the change is small; send large changes whole.
    #[default]
    Auto,
}

impl DeltaMode {
    /// Callers pass a plain boolean: enabled means auto, disabled means
    /// off, absent means auto.
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(false) => Self::Off,
            _ => Self::Auto,
        }
    }

    /// Explicit override by name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "on" => Some(Self::On),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Character-level similarity in `[0, 1]`. Two empty texts are identical.
pub fn similarity(prev: &str, now: &str) -> f64 {
    if prev.is_empty() && now.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(prev, now).ratio() as f64
}

fn added_lines<'a>(from: &HashSet<&str>, to_lines: &[&'a str]) -> Vec<&'a str> {
    to_lines
        .iter()
        .copied()
        .filter(|l| !from.contains(l))
        .collect()
}

/// Whether the old→new transition is small enough to ship as a diff.
pub fn is_small_change(prev: &str, now: &str, thresholds: &DeltaThresholds) -> bool {
    let prev_lines: Vec<&str> = prev.lines().collect();
    let now_lines: Vec<&str> = now.lines().collect();
    let prev_set: HashSet<&str> = prev_lines.iter().copied().collect();
    let now_set: HashSet<&str> = now_lines.iter().copied().collect();

    let changed = added_lines(&prev_set, &now_lines).len() + added_lines(&now_set, &prev_lines).len();
    let total = (prev_lines.len() + now_lines.len()).max(1);

    changed <= thresholds.max_changed_lines
        && (changed as f64 / total as f64) <= thresholds.max_changed_fraction
        && similarity(prev, now) >= thresholds.min_similarity
}

/// Render the added/removed block. Added lines come in new-text order,
/// removed lines in old-text order, each list capped.
pub fn build_diff(prev: &str, now: &str, line_cap: usize) -> String {
    let prev_lines: Vec<&str> = prev.lines().collect();
    let now_lines: Vec<&str> = now.lines().collect();
    let prev_set: HashSet<&str> = prev_lines.iter().copied().collect();
    let now_set: HashSet<&str> = now_lines.iter().copied().collect();

    let added = added_lines(&prev_set, &now_lines);
    let removed = added_lines(&now_set, &prev_lines);

    let mut out: Vec<&str> = vec![DELTA_CHANGED];
    if !added.is_empty() {
        out.push(ADDED_MARKER);
        out.extend(added.iter().copied().take(line_cap));
    }
    if !removed.is_empty() {
        out.push(REMOVED_MARKER);
        out.extend(removed.iter().copied().take(line_cap));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        let r = similarity("button Submit", "button Submits");
        assert!(r > 0.9 && r < 1.0);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(DeltaMode::from_flag(None), DeltaMode::Auto);
        assert_eq!(DeltaMode::from_flag(Some(true)), DeltaMode::Auto);
        assert_eq!(DeltaMode::from_flag(Some(false)), DeltaMode::Off);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(DeltaMode::parse("on"), Some(DeltaMode::On));
        assert_eq!(DeltaMode::parse(" OFF "), Some(DeltaMode::Off));
        assert_eq!(DeltaMode::parse("auto"), Some(DeltaMode::Auto));
        assert_eq!(DeltaMode::parse("sometimes"), None);
    }

    #[test]
    fn test_build_diff_blocks() {
        let prev = "a\nb\nc";
        let now = "a\nc\nd";
        let diff = build_diff(prev, now, 200);
        assert_eq!(diff, "[snapshot:delta] changed\n[added]\nd\n[removed]\nb");
    }

    #[test]
    fn test_build_diff_reordered_lines_are_unchanged() {
        let diff = build_diff("a\nb", "b\na", 200);
        assert_eq!(diff, DELTA_CHANGED);
    }

    #[test]
    fn test_build_diff_respects_cap() {
        let prev = "";
        let now: String = (0..10).map(|i| format!("line {i}\n")).collect();
        let diff = build_diff(prev, now.trim_end(), 3);
        let added: Vec<&str> = diff.lines().skip(2).collect();
        assert_eq!(added, vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_small_change_judgement() {
        let t = DeltaThresholds::default();
        let prev: String = (0..100).map(|i| format!("row number {i}\n")).collect();
        let mut now = prev.clone();
        now = now.replace("row number 10", "row number 10 updated");
        now = now.replace("row number 50", "row number 50 updated");
        assert!(is_small_change(&prev, &now, &t));

        let unrelated: String = (0..100).map(|i| format!("completely different {i}\n")).collect();
        assert!(!is_small_change(&prev, &unrelated, &t));
    }

    #[test]
    fn test_small_change_empty_inputs() {
        let t = DeltaThresholds::default();
        assert!(is_small_change("", "", &t));
    }
}
