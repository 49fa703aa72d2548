//! Marker-density sectioner.

use std::collections::HashMap;

use super::classify::{Classifier, MarkerKind};
use crate::safe_truncate;

/// Weak layout markers are suppressed while a heading occurred within this
/// many lines.
const STRONG_HEADING_WINDOW: usize = 20;
/// ...or while any marker at all occurred within this many lines. Keeps
/// dense layouts from fragmenting into micro-sections.
const ANY_MARKER_WINDOW: usize = 6;

/// Maximum section title length.
const TITLE_MAX_CHARS: usize = 160;

/// A contiguous, titled run of lines: `[start, end)`. Sections cover the
/// whole line range without overlap; section 0 starts at line 0 even when
/// nothing anchors it.
#[derive(Debug, Clone)]
pub struct Section {
    pub start: usize,
    pub end: usize,
    pub title: String,
    pub kind: Option<MarkerKind>,
    /// Any contained line is interactive.
    pub interactive: bool,
    /// Anchored by a dialog marker.
    pub dialog: bool,
}

/// Partition the line sequence into sections. Strong markers (heading,
/// dialog) always open a section; weak ones only when the neighborhood is
/// not already dense with markers.
pub fn split_sections(lines: &[&str], classifier: &Classifier) -> Vec<Section> {
    let mut starts: Vec<usize> = vec![0];
    let mut titles: HashMap<usize, String> = HashMap::new();
    let mut kinds: HashMap<usize, MarkerKind> = HashMap::new();

    let mut last_heading: Option<usize> = None;
    let mut last_marker: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        // Line 0 starts section 0 whether or not it is a marker.
        if i == 0 {
            continue;
        }
        let Some(kind) = classifier.marker_kind(line) else {
            continue;
        };

        if !kind.is_strong() {
            if last_heading.is_some_and(|h| i - h <= STRONG_HEADING_WINDOW) {
                continue;
            }
            if last_marker.is_some_and(|m| i - m <= ANY_MARKER_WINDOW) {
                continue;
            }
        }

        starts.push(i);
        titles.insert(i, safe_truncate(line.trim(), TITLE_MAX_CHARS).to_string());
        kinds.insert(i, kind);
        last_marker = Some(i);
        // Only headings open the suppression window; a dialog anchors but
        // does not suppress later layout markers.
        if kind == MarkerKind::Heading {
            last_heading = Some(i);
        }
    }

    starts.sort_unstable();
    starts.dedup();

    let mut sections = Vec::with_capacity(starts.len());
    for (idx, &start) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).copied().unwrap_or(lines.len());
        let kind = kinds.get(&start).copied();
        let interactive = lines[start..end].iter().any(|l| classifier.is_interactive(l));
        sections.push(Section {
            start,
            end,
            title: titles.get(&start).cloned().unwrap_or_default(),
            kind,
            interactive,
            dialog: kind == Some(MarkerKind::Dialog),
        });
    }
    sections
}
