//! Inline attribute list merging and the attribute panel.

use caret_ast::{Node, escape_ial_value};

use crate::cursor::unescape_ial;

/// Ordered tag attributes. Values are written verbatim, so callers escape them.
pub type Attrs = Vec<(String, String)>;

/// Append one attribute.
pub fn push_attr(attrs: &mut Attrs, key: &str, value: impl Into<String>) {
    attrs.push((key.to_owned(), value.into()));
}

/// How the node's own `id` pair is treated when merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPair {
    /// Emit the IAL `id` pair again after the fixed attributes.
    Keep,
    /// Leave it out; `data-node-id` already carries it.
    Omit,
}

/// Append the block attributes of `node`.
///
/// Order: `data-node-id`, `data-node-index` when given, `data-type` (the canonical kind
/// name), `class`, then every IAL pair in source order with escaped newlines restored. IAL values
/// are stored attribute-escaped (see [`caret_ast::sanitize_ial`]) and written as stored.
pub fn merge_attrs(
    attrs: &mut Attrs,
    node: &Node,
    node_id: String,
    node_index: Option<i64>,
    class: &str,
    id_pair: IdPair,
) {
    push_attr(attrs, "data-node-id", node_id);
    if let Some(index) = node_index {
        push_attr(attrs, "data-node-index", index.to_string());
    }
    push_attr(attrs, "data-type", node.kind.name());
    push_attr(attrs, "class", class);
    for (key, value) in &node.ial {
        if id_pair == IdPair::Omit && key == "id" {
            continue;
        }
        push_attr(attrs, key, unescape_ial(value));
    }
}

fn ial_value(node: &Node, key: &str) -> Option<String> {
    node.ial_attr(key)
        .filter(|v| !v.is_empty())
        .map(|v| escape_ial_value(&unescape_ial(v)))
}

/// Attribute panel shown under a block: bookmark, name, alias, memo and reference count.
pub fn render_panel(node: &Node, out: &mut String) {
    out.push_str(r#"<div class="protyle-attr" contenteditable="false">"#);
    if let Some(bookmark) = ial_value(node, "bookmark") {
        out.push_str(r#"<div class="protyle-attr--bookmark">"#);
        out.push_str(&bookmark);
        out.push_str("</div>");
    }
    if let Some(name) = ial_value(node, "name") {
        out.push_str(r##"<div class="protyle-attr--name"><svg><use xlink:href="#iconN"></use></svg>"##);
        out.push_str(&name);
        out.push_str("</div>");
    }
    if let Some(alias) = ial_value(node, "alias") {
        out.push_str(r##"<div class="protyle-attr--alias"><svg><use xlink:href="#iconA"></use></svg>"##);
        out.push_str(&alias);
        out.push_str("</div>");
    }
    if let Some(memo) = ial_value(node, "memo") {
        out.push_str(r#"<div class="protyle-attr--memo b3-tooltips b3-tooltips__nw" aria-label=""#);
        out.push_str(&memo);
        out.push_str(r##""><svg><use xlink:href="#iconM"></use></svg></div>"##);
    }
    if let Some(refcount) = ial_value(node, "refcount") {
        out.push_str(r#"<div class="protyle-attr--refcount popover__block">"#);
        out.push_str(&refcount);
        out.push_str("</div>");
    }
    out.push_str("</div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use caret_ast::NodeKind;
    use pretty_assertions::assert_eq;

    fn node_with_ial(pairs: &[(&str, &str)]) -> Node {
        let mut node = Node::new(NodeKind::Paragraph);
        node.ial = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        node
    }

    fn keys(attrs: &Attrs) -> Vec<&str> {
        attrs.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_merge_keeps_order_and_duplicates() {
        let node = node_with_ial(&[("id", "n1"), ("style", "a"), ("style", "b")]);
        let mut attrs = Attrs::new();
        merge_attrs(&mut attrs, &node, "n1".to_owned(), None, "p", IdPair::Keep);
        assert_eq!(
            keys(&attrs),
            vec!["data-node-id", "data-type", "class", "id", "style", "style"]
        );
        assert_eq!(attrs[1].1, "NodeParagraph");
        assert_eq!(attrs[5].1, "b");
    }

    #[test]
    fn test_merge_omits_id_and_adds_index() {
        let node = node_with_ial(&[("id", "n1"), ("memo", "x_esc_newline_y")]);
        let mut attrs = Attrs::new();
        merge_attrs(&mut attrs, &node, "n1".to_owned(), Some(3), "p", IdPair::Omit);
        assert_eq!(
            keys(&attrs),
            vec!["data-node-id", "data-node-index", "data-type", "class", "memo"]
        );
        assert_eq!(attrs[4].1, "x\ny");
    }

    #[test]
    fn test_panel_order_and_escaping() {
        let node = node_with_ial(&[("refcount", "2"), ("name", "<n>"), ("bookmark", "b")]);
        let mut out = String::new();
        render_panel(&node, &mut out);
        assert_eq!(
            out,
            concat!(
                r#"<div class="protyle-attr" contenteditable="false">"#,
                r#"<div class="protyle-attr--bookmark">b</div>"#,
                r##"<div class="protyle-attr--name"><svg><use xlink:href="#iconN"></use></svg>&lt;n&gt;</div>"##,
                r#"<div class="protyle-attr--refcount popover__block">2</div>"#,
                "</div>"
            )
        );
    }

    #[test]
    fn test_panel_keeps_stored_entities() {
        let node = node_with_ial(&[("memo", "a &quot;b&quot; & c")]);
        let mut out = String::new();
        render_panel(&node, &mut out);
        assert!(out.contains(r#"aria-label="a &quot;b&quot; &amp; c""#));
    }

    #[test]
    fn test_empty_panel() {
        let mut out = String::new();
        render_panel(&Node::new(NodeKind::Paragraph), &mut out);
        assert_eq!(out, r#"<div class="protyle-attr" contenteditable="false"></div>"#);
    }
}
