//! Code block languages.

use crate::cursor::strip_caret;

/// Languages rendered by the front end (charts, diagrams) instead of highlighted.
const NO_HIGHLIGHT_LANGUAGES: &[&str] = &[
    "mermaid", "echarts", "abc", "graphviz", "flowchart", "mindmap", "plantuml", "markmap",
];

/// Whether a code block in `language` is a deferred render node rather than code.
pub fn is_no_highlight_language(language: &str) -> bool {
    NO_HIGHLIGHT_LANGUAGES.contains(&language)
}

/// First word of an info string, caret removed.
pub(crate) fn info_language(info: &str) -> String {
    strip_caret(info)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_highlight_languages() {
        assert!(is_no_highlight_language("mermaid"));
        assert!(is_no_highlight_language("plantuml"));
        assert!(!is_no_highlight_language("rust"));
        assert!(!is_no_highlight_language("Mermaid"));
    }

    #[test]
    fn test_info_language() {
        assert_eq!(info_language("rust linenos"), "rust");
        assert_eq!(info_language("go‸"), "go");
        assert_eq!(info_language(""), "");
    }
}
