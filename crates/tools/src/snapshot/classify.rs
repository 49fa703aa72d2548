//! Line classification: section markers and interactive controls.

/// Structural marker kinds, strongest first. `Heading` and `Dialog` always
/// anchor a new section; the rest are layout markers subject to density
/// suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Heading,
    Dialog,
    Header,
    Navigation,
    Main,
    Footer,
    Tablist,
    Toolbar,
}

impl MarkerKind {
    /// Strong markers anchor unconditionally.
    pub fn is_strong(self) -> bool {
        matches!(self, Self::Heading | Self::Dialog)
    }
}

/// Default marker rules. Order is load-bearing: rules are tried top to
/// bottom and the first keyword hit wins, so e.g. a line mentioning both
/// "heading" and "navigation" classifies as a heading.
const MARKER_RULES: &[(&[&str], MarkerKind)] = &[
    (&["heading"], MarkerKind::Heading),
    (&["dialog", "modal"], MarkerKind::Dialog),
    (&["header", "banner"], MarkerKind::Header),
    (&["navigation", "nav"], MarkerKind::Navigation),
    (&["main"], MarkerKind::Main),
    (&["footer", "contentinfo"], MarkerKind::Footer),
    (&["tablist"], MarkerKind::Tablist),
    (&["toolbar"], MarkerKind::Toolbar),
];

/// Control-role vocabulary. A line containing any of these (case
/// insensitive) is treated as something the agent can act on.
const INTERACTIVE_KEYWORDS: &[&str] = &[
    "button", "link", "textbox", "input", "checkbox", "radio",
    "combobox", "select", "menu", "tab", "dialog", "option",
];

/// Pure keyword classifier over a line of snapshot text. The tables are
/// data so the vocabulary can be extended without touching control flow.
#[derive(Debug, Clone)]
pub struct Classifier {
    marker_rules: Vec<(Vec<String>, MarkerKind)>,
    interactive_keywords: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            marker_rules: MARKER_RULES
                .iter()
                .map(|(kws, kind)| (kws.iter().map(|k| k.to_string()).collect(), *kind))
                .collect(),
            interactive_keywords: INTERACTIVE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Classifier {
    /// Custom vocabulary. Rule order is preserved as given.
    pub fn new(
        marker_rules: Vec<(Vec<String>, MarkerKind)>,
        interactive_keywords: Vec<String>,
    ) -> Self {
        Self {
            marker_rules,
            interactive_keywords,
        }
    }

    /// Marker kind of a line, if any. Trims and lowercases; empty lines
    /// carry no marker.
    pub fn marker_kind(&self, line: &str) -> Option<MarkerKind> {
        let l = line.trim().to_lowercase();
        if l.is_empty() {
            return None;
        }
        self.marker_rules
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| l.contains(k.as_str())))
            .map(|(_, kind)| *kind)
    }

    /// Whether a line mentions an interactive control role.
    pub fn is_interactive(&self, line: &str) -> bool {
        let l = line.to_lowercase();
        self.interactive_keywords.iter().any(|k| l.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_priority_order() {
        let c = Classifier::default();
        // heading beats every later rule
        assert_eq!(c.marker_kind("heading inside navigation"), Some(MarkerKind::Heading));
        // dialog beats layout markers
        assert_eq!(c.marker_kind("modal overlay in main area"), Some(MarkerKind::Dialog));
        // header beats navigation
        assert_eq!(c.marker_kind("banner with nav links"), Some(MarkerKind::Header));
    }

    #[test]
    fn test_marker_vocabulary() {
        let c = Classifier::default();
        assert_eq!(c.marker_kind("navigation Sidebar"), Some(MarkerKind::Navigation));
        assert_eq!(c.marker_kind("  main Content  "), Some(MarkerKind::Main));
        assert_eq!(c.marker_kind("contentinfo legal"), Some(MarkerKind::Footer));
        assert_eq!(c.marker_kind("tablist Settings"), Some(MarkerKind::Tablist));
        assert_eq!(c.marker_kind("toolbar Formatting"), Some(MarkerKind::Toolbar));
        assert_eq!(c.marker_kind("plain paragraph text"), None);
        assert_eq!(c.marker_kind(""), None);
        assert_eq!(c.marker_kind("   "), None);
    }

    #[test]
    fn test_marker_case_insensitive() {
        let c = Classifier::default();
        assert_eq!(c.marker_kind("HEADING Welcome"), Some(MarkerKind::Heading));
        assert_eq!(c.marker_kind("Dialog Confirm"), Some(MarkerKind::Dialog));
    }

    #[test]
    fn test_interactive_lines() {
        let c = Classifier::default();
        assert!(c.is_interactive("button Submit [ref=e3]"));
        assert!(c.is_interactive("LINK Home"));
        assert!(c.is_interactive("combobox Country"));
        assert!(!c.is_interactive("image Product photo"));
        assert!(!c.is_interactive(""));
    }

    #[test]
    fn test_strong_kinds() {
        assert!(MarkerKind::Heading.is_strong());
        assert!(MarkerKind::Dialog.is_strong());
        assert!(!MarkerKind::Navigation.is_strong());
        assert!(!MarkerKind::Toolbar.is_strong());
    }
}
