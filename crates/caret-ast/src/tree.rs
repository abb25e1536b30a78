//! Arena-backed document tree.
//!
//! Nodes are stored in a `Vec` and addressed by [`NodeId`]. Parent, sibling and child links
//! are ids rather than references, so a handler can insert or detach nodes while the tree is
//! being walked without invalidating anything the walker holds.

use crate::{CARET, Node, NodeId, NodeKind};

/// Document tree plus the definitions collected while it was built.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    footnote_defs: Vec<NodeId>,
    link_ref_defs: Vec<(String, NodeId)>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding an empty document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            root: NodeId(0),
            footnote_defs: Vec::new(),
            link_ref_defs: Vec::new(),
        }
    }

    /// Root document node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_child(self.root).is_none()
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.insert_node(Node::new(kind))
    }

    /// Allocate a detached node with tokens.
    pub fn new_text_node(&mut self, kind: NodeKind, tokens: impl Into<String>) -> NodeId {
        let mut node = Node::new(kind);
        node.tokens = tokens.into();
        self.insert_node(node)
    }

    /// Move a prepared node into the arena.
    pub fn insert_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        let mut node = node;
        node.parent = None;
        node.prev = None;
        node.next = None;
        node.first_child = None;
        node.last_child = None;
        self.nodes.push(node);
        id
    }

    /// Allocate a node with tokens and append it to `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind, tokens: impl Into<String>) -> NodeId {
        let id = self.new_text_node(kind, tokens);
        self.append_child(parent, id);
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    #[must_use]
    pub fn tokens(&self, id: NodeId) -> &str {
        &self.node(id).tokens
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev
    }

    /// Iterate over the direct children of `id`.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// First direct child of the given kind.
    #[must_use]
    pub fn child_by_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).find(|&c| self.kind(c) == kind)
    }

    /// Whether any ancestor of `id` has the given kind.
    #[must_use]
    pub fn parent_is(&self, id: NodeId, kind: NodeKind) -> bool {
        self.ancestor(id, kind).is_some()
    }

    /// Nearest ancestor of the given kind.
    #[must_use]
    pub fn ancestor(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if self.kind(p) == kind {
                return Some(p);
            }
            current = self.parent(p);
        }
        None
    }

    /// All nodes of the subtree rooted at `id`, in pre-order, `id` included.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let mut child = self.last_child(n);
            while let Some(c) = child {
                stack.push(c);
                child = self.prev(c);
            }
        }
        out
    }

    /// Deepest last descendant, or `id` itself when it has no children.
    #[must_use]
    pub fn last_deepest_child(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(last) = self.last_child(current) {
            current = last;
        }
        current
    }

    /// Visible text of the subtree: the tokens of text-like nodes concatenated.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.kind(n).is_textual())
            .map(|n| self.tokens(n))
            .collect()
    }

    /// Visible text of the previous sibling, or an empty string.
    #[must_use]
    pub fn previous_node_text(&self, id: NodeId) -> String {
        self.prev(id).map(|p| self.text(p)).unwrap_or_default()
    }

    /// Visible text of the next sibling, or an empty string.
    #[must_use]
    pub fn next_node_text(&self, id: NodeId) -> String {
        self.next(id).map(|n| self.text(n)).unwrap_or_default()
    }

    /// Detach `id` from its parent and siblings. Its own children stay attached to it.
    pub fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.node(id);
            (node.parent, node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).last_child = prev;
                }
            }
        }
        let node = self.node_mut(id);
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        self.node_mut(child).parent = Some(parent);
        match self.last_child(parent) {
            Some(last) => {
                self.node_mut(last).next = Some(child);
                self.node_mut(child).prev = Some(last);
                self.node_mut(parent).last_child = Some(child);
            }
            None => {
                let p = self.node_mut(parent);
                p.first_child = Some(child);
                p.last_child = Some(child);
            }
        }
    }

    /// Insert `child` as the first child of `parent`, detaching it first.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        self.node_mut(child).parent = Some(parent);
        match self.first_child(parent) {
            Some(first) => {
                self.node_mut(first).prev = Some(child);
                self.node_mut(child).next = Some(first);
                self.node_mut(parent).first_child = Some(child);
            }
            None => {
                let p = self.node_mut(parent);
                p.first_child = Some(child);
                p.last_child = Some(child);
            }
        }
    }

    /// Insert `sibling` right after `id`.
    pub fn insert_after(&mut self, id: NodeId, sibling: NodeId) {
        self.unlink(sibling);
        let next = self.next(id);
        let parent = self.parent(id);
        {
            let s = self.node_mut(sibling);
            s.next = next;
            s.prev = Some(id);
            s.parent = parent;
        }
        match next {
            Some(n) => self.node_mut(n).prev = Some(sibling),
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).last_child = Some(sibling);
                }
            }
        }
        self.node_mut(id).next = Some(sibling);
    }

    /// Insert `sibling` right before `id`.
    pub fn insert_before(&mut self, id: NodeId, sibling: NodeId) {
        self.unlink(sibling);
        let prev = self.prev(id);
        let parent = self.parent(id);
        {
            let s = self.node_mut(sibling);
            s.prev = prev;
            s.next = Some(id);
            s.parent = parent;
        }
        match prev {
            Some(p) => self.node_mut(p).next = Some(sibling),
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = Some(sibling);
                }
            }
        }
        self.node_mut(id).prev = Some(sibling);
    }

    /// Register a footnote definition. Lookups return the first registration of a label.
    pub fn register_footnote_def(&mut self, def: NodeId) {
        self.footnote_defs.push(def);
    }

    /// Footnote definitions in registration order.
    #[must_use]
    pub fn footnote_defs(&self) -> &[NodeId] {
        &self.footnote_defs
    }

    /// Find a footnote definition by label.
    ///
    /// Returns the 1-based ordinal of the definition among all registered definitions and
    /// the definition node. Labels compare case-insensitively and the edit caret is ignored.
    #[must_use]
    pub fn find_footnote_def(&self, label: &str) -> Option<(usize, NodeId)> {
        let wanted = label.replace(CARET, "").to_lowercase();
        self.footnote_defs
            .iter()
            .enumerate()
            .find(|(_, def)| self.tokens(**def).to_lowercase() == wanted)
            .map(|(i, def)| (i + 1, *def))
    }

    /// Register a link reference definition under `label`.
    pub fn register_link_ref_def(&mut self, label: &str, def: NodeId) {
        self.link_ref_defs.push((normalize_label(label), def));
    }

    /// Link reference definitions in registration order.
    pub fn link_ref_defs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.link_ref_defs.iter().map(|(_, id)| *id)
    }

    /// Find a link reference definition; the first registration of a label wins.
    #[must_use]
    pub fn find_link_ref_def(&self, label: &str) -> Option<NodeId> {
        let wanted = normalize_label(label);
        self.link_ref_defs
            .iter()
            .find(|(l, _)| *l == wanted)
            .map(|(_, id)| *id)
    }
}

/// Case-fold a reference label and collapse internal whitespace.
fn normalize_label(label: &str) -> String {
    label
        .replace(CARET, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Iterator over the direct children of a node.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(tree: &Tree, parent: NodeId) -> Vec<NodeKind> {
        tree.children(parent).map(|c| tree.kind(c)).collect()
    }

    #[test]
    fn test_append_and_prepend() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        let h = tree.new_node(NodeKind::Heading);
        tree.prepend_child(root, h);
        assert_eq!(kinds(&tree, root), vec![NodeKind::Heading, NodeKind::Paragraph]);
        assert_eq!(tree.first_child(root), Some(h));
        assert_eq!(tree.last_child(root), Some(p));
        assert_eq!(tree.parent(p), Some(root));
    }

    #[test]
    fn test_insert_after_last_updates_parent() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.append(root, NodeKind::Paragraph, "");
        let b = tree.new_node(NodeKind::ThematicBreak);
        tree.insert_after(a, b);
        assert_eq!(tree.last_child(root), Some(b));
        assert_eq!(tree.next(a), Some(b));
        assert_eq!(tree.prev(b), Some(a));
    }

    #[test]
    fn test_insert_before_first_updates_parent() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.append(root, NodeKind::Paragraph, "");
        let b = tree.new_node(NodeKind::ThematicBreak);
        tree.insert_before(a, b);
        assert_eq!(tree.first_child(root), Some(b));
        assert_eq!(kinds(&tree, root), vec![NodeKind::ThematicBreak, NodeKind::Paragraph]);
    }

    #[test]
    fn test_unlink_middle_child() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.append(root, NodeKind::Text, "a");
        let b = tree.append(root, NodeKind::Text, "b");
        let c = tree.append(root, NodeKind::Text, "c");
        tree.unlink(b);
        assert_eq!(tree.next(a), Some(c));
        assert_eq!(tree.prev(c), Some(a));
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.text(root), "ac");
    }

    #[test]
    fn test_append_child_moves_node() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p1 = tree.append(root, NodeKind::Paragraph, "");
        let p2 = tree.append(root, NodeKind::Paragraph, "");
        let t = tree.append(p1, NodeKind::Text, "x");
        tree.append_child(p2, t);
        assert_eq!(tree.first_child(p1), None);
        assert_eq!(tree.first_child(p2), Some(t));
    }

    #[test]
    fn test_text_collects_textual_nodes() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        tree.append(p, NodeKind::Text, "Hello ");
        let em = tree.append(p, NodeKind::Emphasis, "");
        tree.append(em, NodeKind::EmA6kOpenMarker, "*");
        tree.append(em, NodeKind::Text, "world");
        tree.append(em, NodeKind::EmA6kCloseMarker, "*");
        assert_eq!(tree.text(p), "Hello world");
        assert_eq!(tree.previous_node_text(em), "Hello ");
        assert_eq!(tree.next_node_text(em), "");
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        let t = tree.append(p, NodeKind::Text, "a");
        let hr = tree.append(root, NodeKind::ThematicBreak, "");
        assert_eq!(tree.descendants(root), vec![root, p, t, hr]);
        assert_eq!(tree.last_deepest_child(root), hr);
        assert_eq!(tree.last_deepest_child(p), t);
    }

    #[test]
    fn test_find_footnote_def_is_one_based_and_case_insensitive() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.append(root, NodeKind::FootnotesDefBlock, "");
        let a = tree.append(block, NodeKind::FootnotesDef, "^a");
        let b = tree.append(block, NodeKind::FootnotesDef, "^B");
        tree.register_footnote_def(a);
        tree.register_footnote_def(b);
        assert_eq!(tree.find_footnote_def("^a"), Some((1, a)));
        assert_eq!(tree.find_footnote_def("^b"), Some((2, b)));
        assert_eq!(tree.find_footnote_def("^b‸"), Some((2, b)));
        assert_eq!(tree.find_footnote_def("^c"), None);
    }

    #[test]
    fn test_find_footnote_def_first_registration_wins() {
        let mut tree = Tree::new();
        let first = tree.new_text_node(NodeKind::FootnotesDef, "^x");
        let second = tree.new_text_node(NodeKind::FootnotesDef, "^X");
        tree.register_footnote_def(first);
        tree.register_footnote_def(second);
        assert_eq!(tree.find_footnote_def("^x"), Some((1, first)));
    }

    #[test]
    fn test_find_link_ref_def_normalizes_label() {
        let mut tree = Tree::new();
        let def = tree.new_text_node(NodeKind::LinkRefDef, "Foo  Bar");
        tree.register_link_ref_def("Foo  Bar", def);
        assert_eq!(tree.find_link_ref_def("foo bar"), Some(def));
        assert_eq!(tree.find_link_ref_def("baz"), None);
    }

    #[test]
    fn test_ancestor_lookup() {
        let mut tree = Tree::new();
        let root = tree.root();
        let table = tree.append(root, NodeKind::Table, "");
        let row = tree.append(table, NodeKind::TableRow, "");
        let cell = tree.append(row, NodeKind::TableCell, "");
        assert_eq!(tree.ancestor(cell, NodeKind::Table), Some(table));
        assert!(tree.parent_is(cell, NodeKind::TableRow));
        assert!(!tree.parent_is(cell, NodeKind::TableHead));
    }
}
