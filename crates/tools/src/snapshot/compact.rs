//! Region selection and size budgeting.

use std::collections::BTreeSet;

use super::classify::Classifier;
use super::section::{split_sections, Section};
use crate::safe_truncate;

/// Lines of context kept around each interactive line at level 0.
const CONTEXT_LINES: usize = 1;

/// Compaction output: the surviving text and whether the char budget cut
/// it short.
#[derive(Debug, Clone)]
pub struct Compaction {
    pub text: String,
    pub truncated: bool,
}

/// Indices of lines that survive filtering at the given detail level.
///
/// Level 0 keeps interactive lines with a ±1 window, section anchors (plus
/// the line just above, for a readable title), and entire dialog sections.
/// Level 1 keeps whole sections that are interactive or dialogs. Level 2+
/// keeps everything.
fn select_lines(
    line_count: usize,
    sections: &[Section],
    interactive: &[usize],
    level: u8,
) -> BTreeSet<usize> {
    let mut kept = BTreeSet::new();
    match level {
        0 => {
            for &i in interactive {
                let lo = i.saturating_sub(CONTEXT_LINES);
                let hi = (i + CONTEXT_LINES + 1).min(line_count);
                kept.extend(lo..hi);
            }
            for sec in sections {
                if sec.interactive {
                    kept.insert(sec.start);
                    if sec.start > 0 {
                        kept.insert(sec.start - 1);
                    }
                }
                // Dialogs are short-lived and high-value; never fragment them.
                if sec.dialog {
                    kept.extend(sec.start..sec.end);
                }
            }
        }
        1 => {
            for sec in sections {
                if sec.interactive || sec.dialog {
                    kept.extend(sec.start..sec.end);
                }
            }
        }
        _ => {
            kept.extend(0..line_count);
        }
    }
    kept
}

/// Run the full compaction: sectioning, selection, rendering, budgeting.
/// A `max_chars` of 0 disables the budget.
pub fn compact(raw: &str, classifier: &Classifier, level: u8, max_chars: usize) -> Compaction {
    let lines: Vec<&str> = raw.lines().collect();
    let sections = split_sections(&lines, classifier);
    let interactive: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| classifier.is_interactive(l))
        .map(|(i, _)| i)
        .collect();

    let kept = select_lines(lines.len(), &sections, &interactive, level);

    // Filtering must never silently discard everything: with no match at
    // all, fall back to the full text.
    let filtered = if kept.is_empty() {
        lines.join("\n")
    } else {
        kept.iter()
            .map(|&i| lines[i])
            .collect::<Vec<_>>()
            .join("\n")
    };

    if max_chars > 0 && filtered.len() > max_chars {
        Compaction {
            text: safe_truncate(&filtered, max_chars).to_string(),
            truncated: true,
        }
    } else {
        Compaction {
            text: filtered,
            truncated: false,
        }
    }
}
