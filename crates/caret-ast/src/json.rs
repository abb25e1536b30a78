//! Nested JSON form of a tree.
//!
//! The arena is flattened into nested objects keyed by canonical kind names:
//!
//! ```json
//! { "type": "NodeDocument", "children": [
//!   { "type": "NodeParagraph", "ial": [["id", "20060102150405-1a2b3c4"]], "children": [
//!     { "type": "NodeText", "tokens": "Hello" }
//!   ] }
//! ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::{Align, LinkType, ListData, Node, NodeId, NodeKind, Tree, sanitize_ial};

/// Error decoding a JSON tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A `type` that names no known kind.
    #[error("Unknown node type: {0}")]
    UnknownKind(String),
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero_u8(value: &u8) -> bool {
    *value == 0
}

fn is_zero_usize(value: &usize) -> bool {
    *value == 0
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// One node of the JSON form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonNode {
    /// Canonical kind name, e.g. `NodeParagraph`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tokens: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ial: Vec<(String, String)>,
    #[serde(skip_serializing_if = "is_zero_u8")]
    pub heading_level: u8,
    #[serde(skip_serializing_if = "is_false")]
    pub heading_setext: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListData>,
    #[serde(skip_serializing_if = "is_false")]
    pub task_checked: bool,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub code_marker_len: usize,
    #[serde(skip_serializing_if = "is_false")]
    pub fenced: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code_block_info: String,
    #[serde(skip_serializing_if = "is_default")]
    pub table_cell_align: Align,
    #[serde(skip_serializing_if = "is_default")]
    pub link_type: LinkType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link_ref_label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub footnotes_ref_label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub footnotes_ref_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub html_entity_tokens: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<JsonNode>,
}

impl Tree {
    /// Decode a tree from its JSON form.
    ///
    /// A root that is not a document is wrapped in one. Footnote definitions and link
    /// reference definitions are registered in document order.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let root: JsonNode = serde_json::from_str(json)?;
        let mut tree = Tree::new();
        let doc = tree.root();
        if root.kind == NodeKind::Document.name() {
            tree.node_mut(doc).ial = sanitize_ial(root.ial);
            for child in root.children {
                tree.attach_json(doc, child)?;
            }
        } else {
            tree.attach_json(doc, root)?;
        }
        Ok(tree)
    }

    /// Encode the tree, starting at the root, into pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string_pretty(&self.json_node(self.root()))?)
    }

    fn attach_json(&mut self, parent: NodeId, json: JsonNode) -> Result<(), TreeError> {
        let kind =
            NodeKind::from_name(&json.kind).ok_or_else(|| TreeError::UnknownKind(json.kind.clone()))?;
        let node = Node {
            kind,
            tokens: json.tokens,
            ial: sanitize_ial(json.ial),
            heading_level: json.heading_level,
            heading_setext: json.heading_setext,
            list: json.list.unwrap_or_default(),
            task_checked: json.task_checked,
            code_marker_len: json.code_marker_len,
            fenced: json.fenced,
            code_block_info: json.code_block_info,
            table_cell_align: json.table_cell_align,
            link_type: json.link_type,
            link_ref_label: json.link_ref_label,
            footnotes_ref_label: json.footnotes_ref_label,
            footnotes_ref_id: json.footnotes_ref_id,
            html_entity_tokens: json.html_entity_tokens,
            ..Node::default()
        };
        let id = self.insert_node(node);
        self.append_child(parent, id);
        match kind {
            NodeKind::FootnotesDef => self.register_footnote_def(id),
            NodeKind::LinkRefDef => {
                let label = self.tokens(id).to_owned();
                self.register_link_ref_def(&label, id);
            }
            _ => {}
        }
        for child in json.children {
            self.attach_json(id, child)?;
        }
        Ok(())
    }

    fn json_node(&self, id: NodeId) -> JsonNode {
        let node = self.node(id);
        let has_list = matches!(node.kind, NodeKind::List | NodeKind::ListItem);
        JsonNode {
            kind: node.kind.name().to_owned(),
            tokens: node.tokens.clone(),
            ial: node.ial.clone(),
            heading_level: node.heading_level,
            heading_setext: node.heading_setext,
            list: has_list.then(|| node.list.clone()),
            task_checked: node.task_checked,
            code_marker_len: node.code_marker_len,
            fenced: node.fenced,
            code_block_info: node.code_block_info.clone(),
            table_cell_align: node.table_cell_align,
            link_type: node.link_type,
            link_ref_label: node.link_ref_label.clone(),
            footnotes_ref_label: node.footnotes_ref_label.clone(),
            footnotes_ref_id: node.footnotes_ref_id.clone(),
            html_entity_tokens: node.html_entity_tokens.clone(),
            children: self.children(id).map(|c| self.json_node(c)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_json_builds_tree() {
        let json = r#"{"type": "NodeDocument", "children": [
            {"type": "NodeHeading", "heading_level": 2, "children": [
                {"type": "NodeText", "tokens": "Title"}
            ]},
            {"type": "NodeParagraph", "ial": [["id", "x"]], "children": [
                {"type": "NodeText", "tokens": "Body"}
            ]}
        ]}"#;
        let tree = Tree::from_json(json).unwrap();
        let heading = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(heading), NodeKind::Heading);
        assert_eq!(tree.node(heading).heading_level, 2);
        assert_eq!(tree.text(heading), "Title");
        let para = tree.next(heading).unwrap();
        assert_eq!(tree.node(para).ial_attr("id"), Some("x"));
    }

    #[test]
    fn test_from_json_wraps_non_document_root() {
        let tree = Tree::from_json(r#"{"type": "NodeParagraph"}"#).unwrap();
        let first = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(first), NodeKind::Paragraph);
    }

    #[test]
    fn test_from_json_registers_definitions() {
        let json = r#"{"type": "NodeDocument", "children": [
            {"type": "NodeFootnotesDefBlock", "children": [
                {"type": "NodeFootnotesDef", "tokens": "^1"}
            ]},
            {"type": "NodeLinkRefDefBlock", "children": [
                {"type": "NodeLinkRefDef", "tokens": "foo"}
            ]}
        ]}"#;
        let tree = Tree::from_json(json).unwrap();
        assert_eq!(tree.footnote_defs().len(), 1);
        assert!(tree.find_link_ref_def("FOO").is_some());
    }

    #[test]
    fn test_from_json_escapes_ial() {
        let json = r#"{"type": "NodeParagraph", "ial": [["memo", "x\"y &quot;"], ["on\"x", "1"]]}"#;
        let tree = Tree::from_json(json).unwrap();
        let paragraph = tree.first_child(tree.root()).unwrap();
        assert_eq!(
            tree.node(paragraph).ial,
            vec![("memo".to_owned(), "x&quot;y &quot;".to_owned())]
        );
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let err = Tree::from_json(r#"{"type": "NodeBogus"}"#).unwrap_err();
        assert!(matches!(err, TreeError::UnknownKind(ref k) if k == "NodeBogus"));
    }

    #[test]
    fn test_to_json_omits_defaults() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        tree.append(p, NodeKind::Text, "hi");
        let json = tree.to_json().unwrap();
        assert!(json.contains(r#""type": "NodeText""#));
        assert!(json.contains(r#""tokens": "hi""#));
        assert!(!json.contains("heading_level"));

        let back = Tree::from_json(&json).unwrap();
        assert_eq!(back.text(back.root()), "hi");
    }
}
