//! Node payload and kind-specific scalars.

use serde::{Deserialize, Serialize};

use crate::NodeKind;

/// Index of a node inside a [`Tree`](crate::Tree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    #[default]
    Unordered,
    Ordered,
    Task,
}

/// List and list-item data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListData {
    pub kind: ListKind,
    /// Tight lists render paragraphs without wrappers.
    pub tight: bool,
    /// `*`, `-` or `+` for bullet lists, `None` for ordered ones.
    pub bullet_char: Option<char>,
    /// Start number of an ordered list.
    pub start: u32,
    /// `.` or `)` for ordered lists.
    pub delimiter: Option<char>,
    /// Literal marker of the item (`*`, `1.`, ...).
    pub marker: String,
    /// Ordinal of an ordered list item.
    pub num: u32,
}

/// Alignment of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Align {
    /// Value of the `align` attribute, if any.
    #[must_use]
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}

/// How a link was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// `[text](dest)`
    #[default]
    Inline,
    /// `[label]: dest`
    RefDef,
    /// `<https://...>`
    Autolink,
    /// `[text][label]` or `[label]`
    Reference,
}

/// A node of the document tree.
///
/// Structural links are arena indices managed by [`Tree`](crate::Tree); the remaining fields
/// are populated only for the kinds that use them.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub kind: NodeKind,
    /// Raw token text.
    pub tokens: String,
    /// Inline attribute list in source order. Keys may repeat.
    pub ial: Vec<(String, String)>,

    pub heading_level: u8,
    pub heading_setext: bool,
    pub list: ListData,
    pub task_checked: bool,
    /// Number of backticks or dollars of an inline code/math marker.
    pub code_marker_len: usize,
    pub fenced: bool,
    pub code_block_info: String,
    pub table_cell_align: Align,
    pub link_type: LinkType,
    pub link_ref_label: String,
    pub footnotes_ref_label: String,
    pub footnotes_ref_id: String,
    /// Entity as written in the source, e.g. `&amp;`.
    pub html_entity_tokens: String,

    pub(crate) parent: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
}

impl Node {
    /// Create a detached node of the given kind.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// First IAL value for `key`.
    #[must_use]
    pub fn ial_attr(&self, key: &str) -> Option<&str> {
        self.ial
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` in place, or append it when missing.
    pub fn set_ial_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.ial.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.ial.push((key.to_owned(), value));
        }
    }

    /// Remove every pair with `key`.
    pub fn remove_ial_attr(&mut self, key: &str) {
        self.ial.retain(|(k, _)| k != key);
    }
}

/// Whether `key` can be written as an attribute name.
fn is_attr_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Whether `rest` (the text after an `&`) starts with a character reference.
fn starts_with_entity(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };
    let name = &rest[..end];
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = name.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

/// Escape an IAL value for a double-quoted attribute.
///
/// Character references already present are kept, so escaping a stored value again is a no-op.
#[must_use]
pub fn escape_ial_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        match c {
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !starts_with_entity(&value[i + 1..]) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Bring IAL pairs from an untrusted source into their stored form: pairs whose key is not an
/// attribute name are dropped and values are escaped with [`escape_ial_value`].
#[must_use]
pub fn sanitize_ial(ial: Vec<(String, String)>) -> Vec<(String, String)> {
    ial.into_iter()
        .filter(|(key, _)| {
            let keep = is_attr_name(key);
            if !keep {
                tracing::debug!(key, "Dropping IAL pair with invalid key");
            }
            keep
        })
        .map(|(key, value)| {
            let value = escape_ial_value(&value);
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_ial_value() {
        assert_eq!(escape_ial_value(r#"a"onmouseover=x"#), "a&quot;onmouseover=x");
        assert_eq!(escape_ial_value("<b> & c"), "&lt;b&gt; &amp; c");
    }

    #[test]
    fn test_escape_ial_value_keeps_entities() {
        let once = escape_ial_value(r#"say "hi" &amp; &#39;x&#x27;"#);
        assert_eq!(once, "say &quot;hi&quot; &amp; &#39;x&#x27;");
        assert_eq!(escape_ial_value(&once), once);
        assert_eq!(escape_ial_value("&#;"), "&amp;#;");
    }

    #[test]
    fn test_sanitize_ial_drops_bad_keys() {
        let ial = vec![
            ("data-x".to_owned(), "1\"2".to_owned()),
            ("a\"b".to_owned(), "v".to_owned()),
            (String::new(), "v".to_owned()),
        ];
        assert_eq!(
            sanitize_ial(ial),
            vec![("data-x".to_owned(), "1&quot;2".to_owned())]
        );
    }

    #[test]
    fn test_ial_attr_returns_first_match() {
        let mut node = Node::new(NodeKind::Paragraph);
        node.ial.push(("name".to_owned(), "a".to_owned()));
        node.ial.push(("name".to_owned(), "b".to_owned()));
        assert_eq!(node.ial_attr("name"), Some("a"));
        assert_eq!(node.ial_attr("alias"), None);
    }

    #[test]
    fn test_set_ial_attr_updates_or_appends() {
        let mut node = Node::new(NodeKind::Paragraph);
        node.set_ial_attr("id", "1");
        node.set_ial_attr("style", "color: red");
        node.set_ial_attr("id", "2");
        assert_eq!(
            node.ial,
            vec![
                ("id".to_owned(), "2".to_owned()),
                ("style".to_owned(), "color: red".to_owned()),
            ]
        );
        node.remove_ial_attr("id");
        assert_eq!(node.ial.len(), 1);
    }

    #[test]
    fn test_align_attr() {
        assert_eq!(Align::None.as_attr(), None);
        assert_eq!(Align::Center.as_attr(), Some("center"));
    }
}
