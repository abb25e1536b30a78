//! Heading ids and the table of contents.

use std::collections::{HashMap, HashSet};

use caret_ast::{CARET, NodeId, NodeKind, Tree};

use crate::escape::escape_html;

/// Normalized, document-unique ids of every heading.
#[derive(Debug, Default)]
pub struct HeadingIds(HashMap<NodeId, String>);

impl HeadingIds {
    /// Normalize every heading of the document in order, appending `-` to repeated ids.
    #[must_use]
    pub fn collect(tree: &Tree) -> Self {
        let mut ids = HashMap::new();
        let mut used = HashSet::new();
        for node in tree.descendants(tree.root()) {
            if tree.kind(node) != NodeKind::Heading {
                continue;
            }
            let mut id = normalize_heading_id(tree, node);
            while used.contains(&id) {
                id.push('-');
            }
            used.insert(id.clone());
            ids.insert(node, id);
        }
        Self(ids)
    }

    /// Id of a heading, or an empty string for nodes that were not headings when collected.
    #[must_use]
    pub fn get(&self, heading: NodeId) -> &str {
        self.0.get(&heading).map_or("", String::as_str)
    }
}

/// Id derived from the heading's `{#id}` child, or from its text.
///
/// Leading `#` and the caret are dropped and every character that is neither a letter nor
/// a digit becomes `-`.
#[must_use]
pub fn normalize_heading_id(tree: &Tree, heading: NodeId) -> String {
    let explicit = tree
        .child_by_kind(heading, NodeKind::HeadingId)
        .map(|id| tree.tokens(id).to_owned())
        .unwrap_or_default();
    let raw = if explicit.is_empty() {
        tree.text(heading)
    } else {
        explicit
    };
    raw.trim_start_matches('#')
        .replace(CARET, "")
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

/// Inline HTML of a heading as shown in the table of contents.
fn heading_text_html(tree: &Tree, heading: NodeId) -> String {
    let mut out = String::new();
    for n in tree.descendants(heading) {
        let tokens = tree.tokens(n);
        match tree.kind(n) {
            NodeKind::LinkText | NodeKind::BlockRefText => out.push_str(&escape_html(tokens)),
            NodeKind::InlineMathContent => {
                out.push_str(r#"<span class="language-math">"#);
                out.push_str(&escape_html(tokens));
                out.push_str("</span>");
            }
            NodeKind::CodeSpanContent => {
                out.push_str("<code>");
                out.push_str(&escape_html(tokens));
                out.push_str("</code>");
            }
            NodeKind::Text => {
                let wrap = match tree.parent(n).map(|p| tree.kind(p)) {
                    Some(NodeKind::Strong) => Some("strong"),
                    Some(NodeKind::Emphasis) => Some("em"),
                    _ => None,
                };
                match wrap {
                    Some(tag) => {
                        out.push_str(&format!("<{tag}>{}</{tag}>", escape_html(tokens)));
                    }
                    None => out.push_str(&escape_html(tokens)),
                }
            }
            _ => {}
        }
    }
    out
}

struct TocEntry {
    id: String,
    content: String,
    level: u8,
    children: Vec<usize>,
}

/// Render the table of contents block for the top-level headings of the document.
///
/// `prefix` is prepended to normalized ids; an IAL `id` on the heading replaces the id.
pub(crate) fn render_toc(tree: &Tree, ids: &HeadingIds, prefix: &str, out: &mut String) {
    let mut entries: Vec<TocEntry> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    for heading in tree.children(tree.root()) {
        if tree.kind(heading) != NodeKind::Heading {
            continue;
        }
        let node = tree.node(heading);
        let id = match node.ial_attr("id") {
            Some(id) => id.to_owned(),
            None => format!("{prefix}{}", ids.get(heading)),
        };
        let index = entries.len();
        entries.push(TocEntry {
            id,
            content: heading_text_html(tree, heading),
            level: node.heading_level,
            children: Vec::new(),
        });
        while stack
            .last()
            .is_some_and(|&top| entries[top].level >= node.heading_level)
        {
            stack.pop();
        }
        match stack.last() {
            Some(&parent) => entries[parent].children.push(index),
            None => roots.push(index),
        }
        stack.push(index);
    }

    out.push_str(r#"<div class="vditor-toc" data-block="0" data-type="toc-block" contenteditable="false">"#);
    if roots.is_empty() {
        out.push_str("[toc]<br>");
    } else {
        out.push_str("<ul>");
        for &root in &roots {
            render_toc_entry(&entries, root, out);
        }
        out.push_str("</ul>");
    }
    out.push_str("</div>");
}

fn render_toc_entry(entries: &[TocEntry], index: usize, out: &mut String) {
    let entry = &entries[index];
    out.push_str(&format!(
        r#"<li><span data-target-id="{}">{}</span>"#,
        entry.id, entry.content
    ));
    if !entry.children.is_empty() {
        out.push_str("<ul>");
        for &child in &entry.children {
            render_toc_entry(entries, child, out);
        }
        out.push_str("</ul>");
    }
    out.push_str("</li>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn heading(tree: &mut Tree, level: u8, text: &str) -> NodeId {
        let root = tree.root();
        let h = tree.append(root, NodeKind::Heading, "");
        tree.node_mut(h).heading_level = level;
        tree.append(h, NodeKind::Text, text);
        h
    }

    #[test]
    fn test_normalize_heading_id() {
        let mut tree = Tree::new();
        let h = heading(&mut tree, 1, "Hello, World‸ 中文");
        assert_eq!(normalize_heading_id(&tree, h), "Hello--World-中文");
    }

    #[test]
    fn test_explicit_heading_id_wins() {
        let mut tree = Tree::new();
        let h = heading(&mut tree, 1, "Title");
        tree.append(h, NodeKind::HeadingId, "#custom");
        assert_eq!(normalize_heading_id(&tree, h), "custom");
    }

    #[test]
    fn test_repeated_ids_are_deduplicated() {
        let mut tree = Tree::new();
        let a = heading(&mut tree, 1, "Same");
        let b = heading(&mut tree, 2, "Same");
        let c = heading(&mut tree, 2, "Same");
        let ids = HeadingIds::collect(&tree);
        assert_eq!(ids.get(a), "Same");
        assert_eq!(ids.get(b), "Same-");
        assert_eq!(ids.get(c), "Same--");
    }

    #[test]
    fn test_toc_nesting() {
        let mut tree = Tree::new();
        heading(&mut tree, 1, "A");
        heading(&mut tree, 2, "B");
        heading(&mut tree, 3, "C");
        heading(&mut tree, 2, "D");
        heading(&mut tree, 1, "E");
        let ids = HeadingIds::collect(&tree);
        let mut out = String::new();
        render_toc(&tree, &ids, "ir-", &mut out);
        assert_eq!(
            out,
            concat!(
                r#"<div class="vditor-toc" data-block="0" data-type="toc-block" contenteditable="false"><ul>"#,
                r#"<li><span data-target-id="ir-A">A</span><ul>"#,
                r#"<li><span data-target-id="ir-B">B</span><ul><li><span data-target-id="ir-C">C</span></li></ul></li>"#,
                r#"<li><span data-target-id="ir-D">D</span></li>"#,
                r#"</ul></li>"#,
                r#"<li><span data-target-id="ir-E">E</span></li>"#,
                "</ul></div>"
            )
        );
    }

    #[test]
    fn test_empty_toc() {
        let tree = Tree::new();
        let mut out = String::new();
        render_toc(&tree, &HeadingIds::default(), "", &mut out);
        assert!(out.ends_with("[toc]<br></div>"));
    }
}
