//! Traversal dispatcher shared by every backend.

use std::collections::HashSet;

use caret_ast::{IdGenerator, LinkType, NodeId, NodeKind, TimestampIdGenerator, Tree};

use crate::buffer::Buffer;
use crate::cursor::{CARET, ZWSP, strip_caret};
use crate::escape::{escape_html, truncate_chars};
use crate::heading::{HeadingIds, render_toc};
use crate::ial::{self, Attrs, IdPair};
use crate::options::{OptionsError, RenderOptions};
use crate::path::LinkResolver;
use crate::sanitize::{RegexSanitizer, Sanitizer};
use crate::space::{allow_space, space_text};

/// What the dispatcher does after a handler's entering call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Walk the children, then make the leaving call.
    Continue,
    /// Go straight to the leaving call. Handlers that render their own subtree return this.
    SkipChildren,
}

/// Per-kind output rules of one HTML representation.
///
/// Implementations are an exhaustive `match` over [`NodeKind`]; shared machinery lives on
/// [`Renderer`].
pub trait RenderBackend: Sized {
    /// Name used in log records.
    const NAME: &'static str;

    /// Backend specific state carried through a render.
    type State: Default;

    /// Handle `node`, once with `entering = true` and once with `entering = false`.
    ///
    /// The return value of the leaving call is ignored.
    fn render_node(r: &mut Renderer<'_, Self>, node: NodeId, entering: bool) -> Walk;
}

/// Renders a [`Tree`] through a [`RenderBackend`].
///
/// The renderer borrows the tree mutably for the whole render: a few handlers insert
/// synthetic nodes or rewrite tokens of the node they visit.
///
/// # Example
///
/// ```
/// use caret_ast::parse_markdown;
/// use caret_renderer::{RenderOptions, Renderer, WysiwygBackend};
///
/// let mut tree = parse_markdown("Hello *world*");
/// let html = Renderer::<WysiwygBackend>::new(&mut tree, RenderOptions::default())
///     .unwrap()
///     .render();
/// assert!(html.starts_with(r#"<p data-block="0">Hello "#));
/// ```
pub struct Renderer<'t, B: RenderBackend> {
    pub(crate) tree: &'t mut Tree,
    pub(crate) options: RenderOptions,
    pub(crate) links: LinkResolver,
    pub(crate) state: B::State,
    out: Buffer,
    disable_tags: usize,
    rendering_footnotes: bool,
    ids: Box<dyn IdGenerator>,
    sanitizer: Box<dyn Sanitizer>,
    heading_ids: Option<HeadingIds>,
}

impl<'t, B: RenderBackend> Renderer<'t, B> {
    /// Create a renderer over `tree`. The options are validated here, once.
    pub fn new(tree: &'t mut Tree, options: RenderOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let links = LinkResolver::new(options.link_base.clone(), options.link_prefix.clone());
        Ok(Self {
            tree,
            options,
            links,
            state: B::State::default(),
            out: Buffer::new(),
            disable_tags: 0,
            rendering_footnotes: false,
            ids: Box::new(TimestampIdGenerator),
            sanitizer: Box::new(RegexSanitizer),
            heading_ids: None,
        })
    }

    /// Use another source of block ids.
    #[must_use]
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Use another sanitizer.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    /// Render the whole tree.
    pub fn render(mut self) -> String {
        let root = self.tree.root();
        tracing::debug!(backend = B::NAME, nodes = self.tree.len(), "Render started");
        self.walk(root);
        let html = self.out.into_string();
        tracing::debug!(backend = B::NAME, bytes = html.len(), "Render finished");
        html
    }

    /// Walk one subtree: entering call, children unless skipped, leaving call.
    pub fn walk(&mut self, node: NodeId) {
        if B::render_node(self, node, true) == Walk::Continue {
            self.render_children(node);
        }
        B::render_node(self, node, false);
    }

    /// Walk the children of `node`.
    ///
    /// The next sibling is read after each child finishes, so nodes inserted after the
    /// current child during its visit are walked too.
    pub fn render_children(&mut self, node: NodeId) {
        let mut child = self.tree.first_child(node);
        while let Some(c) = child {
            self.walk(c);
            child = self.tree.next(c);
        }
    }

    /// The tree being rendered.
    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// Options of this render.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Whether a footnote definition sub-render is in progress.
    pub fn rendering_footnotes(&self) -> bool {
        self.rendering_footnotes
    }

    // Output

    /// Write raw markup.
    pub fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// Write a character.
    pub fn write_char(&mut self, c: char) {
        self.out.push(c);
    }

    /// Write escaped text.
    pub fn write_escaped(&mut self, s: &str) {
        self.out.push_str(&escape_html(s));
    }

    /// Write a newline unless the output already ends with one.
    pub fn newline(&mut self) {
        self.out.newline();
    }

    /// Last byte of the output.
    pub fn last_byte(&self) -> Option<u8> {
        self.out.last_byte()
    }

    /// Write `<name k="v" ...>`, or `<name ... />` when self-closing.
    ///
    /// A name starting with `/` writes a closing tag. Nothing is written while tags are
    /// disabled.
    pub fn tag<K: AsRef<str>, V: AsRef<str>>(
        &mut self,
        name: &str,
        attrs: &[(K, V)],
        self_closing: bool,
    ) {
        if self.disable_tags > 0 {
            return;
        }
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key.as_ref());
            self.out.push_str("=\"");
            self.out.push_str(value.as_ref());
            self.out.push('"');
        }
        if self_closing {
            self.out.push_str(" /");
        }
        self.out.push('>');
    }

    /// Attribute-less opening tag.
    pub fn open_tag(&mut self, name: &str) {
        self.tag::<&str, &str>(name, &[], false);
    }

    /// Closing tag.
    pub fn close_tag(&mut self, name: &str) {
        self.tag::<&str, &str>(&format!("/{name}"), &[], false);
    }

    /// Suppress tag emission until the matching [`enable_tags`](Self::enable_tags).
    pub fn disable_tags(&mut self) {
        self.disable_tags += 1;
    }

    /// Undo one [`disable_tags`](Self::disable_tags).
    pub fn enable_tags(&mut self) {
        self.disable_tags = self.disable_tags.saturating_sub(1);
    }

    /// Whether tag emission is suppressed.
    pub fn tags_disabled(&self) -> bool {
        self.disable_tags > 0
    }

    /// Start a scratch fragment.
    pub fn open_fragment(&mut self) {
        self.out.open_fragment();
    }

    /// Close the innermost fragment, sanitizing it when `sanitize` is on.
    pub fn close_fragment(&mut self) {
        if self.options.sanitize {
            self.out.close_fragment(Some(self.sanitizer.as_ref()));
        } else {
            self.out.close_fragment(None);
        }
    }

    /// Sanitize `html` when `sanitize` is on.
    pub fn sanitized(&self, html: &str) -> String {
        if self.options.sanitize {
            self.sanitizer.sanitize(html)
        } else {
            html.to_owned()
        }
    }

    // Node helpers

    /// Tokens of `node`, owned.
    pub(crate) fn tokens(&self, node: NodeId) -> String {
        self.tree.tokens(node).to_owned()
    }

    pub(crate) fn kind(&self, node: NodeId) -> NodeKind {
        self.tree.kind(node)
    }

    /// Block id of `node`: its IAL `id`, otherwise a fresh id.
    pub fn node_id(&self, node: NodeId) -> String {
        let n = self.tree.node(node);
        if let Some(id) = n.ial_attr("id") {
            return id.to_owned();
        }
        self.ids.new_id()
    }

    /// Append the merged block attributes of `node`.
    pub fn block_attrs(
        &self,
        attrs: &mut Attrs,
        node: NodeId,
        class: &str,
        node_index: Option<i64>,
        id_pair: IdPair,
    ) {
        let id = self.node_id(node);
        ial::merge_attrs(attrs, self.tree.node(node), id, node_index, class, id_pair);
    }

    /// Write the attribute panel of `node`.
    pub fn render_panel(&mut self, node: NodeId) {
        if self.disable_tags > 0 {
            return;
        }
        let mut panel = String::new();
        ial::render_panel(self.tree.node(node), &mut panel);
        self.out.push_str(&panel);
    }

    /// Resolve a destination through the link base and prefix.
    pub fn resolve_link(&self, dest: &str) -> String {
        self.links.resolve(dest)
    }

    /// Write a spacer when the visible text before `node` is empty.
    pub(crate) fn spacer_before(&mut self, node: NodeId) {
        if strip_caret(&self.tree.previous_node_text(node)).is_empty() {
            self.write(ZWSP);
        }
    }

    /// Normalized document-unique id of a heading.
    pub fn heading_id(&mut self, heading: NodeId) -> String {
        let tree = &*self.tree;
        self.heading_ids
            .get_or_insert_with(|| HeadingIds::collect(tree))
            .get(heading)
            .to_owned()
    }

    /// Write the table of contents with ids carrying `prefix`.
    pub fn render_toc(&mut self, prefix: &str) {
        let tree = &*self.tree;
        let ids = self.heading_ids.get_or_insert_with(|| HeadingIds::collect(tree));
        let mut toc = String::new();
        render_toc(tree, ids, prefix, &mut toc);
        self.out.push_str(&toc);
    }

    /// Normalize a table cell before its children render.
    ///
    /// An empty cell gets a single space, a cell holding only the caret gets a trailing
    /// space, any other first child is trimmed.
    pub fn prepare_table_cell(&mut self, cell: NodeId) {
        match self.tree.first_child(cell) {
            None => {
                let space = self.tree.new_text_node(NodeKind::Text, " ");
                self.tree.append_child(cell, space);
            }
            Some(first) => {
                let node = self.tree.node_mut(first);
                if node.tokens == CARET {
                    node.tokens = format!("{CARET} ");
                } else {
                    node.tokens = node.tokens.trim().to_owned();
                }
            }
        }
    }

    /// Whether a table cell is a header cell. Cells outside a table render as data cells.
    pub fn is_header_cell(&self, cell: NodeId) -> bool {
        let grandparent = self.tree.parent(cell).and_then(|row| self.tree.parent(row));
        match grandparent.map(|g| self.tree.kind(g)) {
            Some(NodeKind::TableHead) => true,
            Some(NodeKind::Table) => false,
            _ => {
                tracing::debug!(?cell, "Table cell without a table");
                false
            }
        }
    }

    // Footnotes and references

    /// 1-based index of the footnote definition `label` refers to, or 0 when undefined.
    pub fn footnote_index(&self, label: &str) -> (usize, Option<NodeId>) {
        match self.tree.find_footnote_def(label) {
            Some((index, def)) => (index, Some(def)),
            None => {
                tracing::debug!(label, "Undefined footnote reference");
                (0, None)
            }
        }
    }

    /// Tooltip text of a footnote definition: caret removed, cut to 24 characters, escaped.
    pub fn footnote_tooltip(&self, def: Option<NodeId>) -> String {
        def.map(|d| {
            let text = strip_caret(&self.tree.text(d));
            escape_html(truncate_chars(&text, 24))
        })
        .unwrap_or_default()
    }

    /// Render every registered footnote definition once, in registration order.
    pub fn render_footnote_defs(&mut self) {
        let defs = self.tree.footnote_defs().to_vec();
        let mut seen = HashSet::new();
        for def in defs {
            if seen.insert(self.tree.tokens(def).to_lowercase()) {
                self.render_footnote_def(def);
            }
        }
    }

    /// Render one definition against a temporary document that holds only it.
    fn render_footnote_def(&mut self, def: NodeId) {
        tracing::trace!(label = self.tree.tokens(def), "Rendering footnote definition");
        let parent = self.tree.parent(def);
        let prev = self.tree.prev(def);
        let doc = self.tree.new_node(NodeKind::Document);
        self.tree.append_child(doc, def);

        let outer = std::mem::replace(&mut self.rendering_footnotes, true);
        self.walk(def);
        self.rendering_footnotes = outer;

        match (prev, parent) {
            (Some(prev), _) => self.tree.insert_after(prev, def),
            (None, Some(parent)) => self.tree.prepend_child(parent, def),
            (None, None) => self.tree.unlink(def),
        }
    }

    /// Destination of a link reference definition node.
    pub fn link_ref_def_dest(&self, def: NodeId) -> String {
        self.tree
            .first_child(def)
            .and_then(|link| self.tree.child_by_kind(link, NodeKind::LinkDest))
            .map(|dest| self.tree.tokens(dest).to_owned())
            .unwrap_or_default()
    }

    /// Write `[label]: dest` and a newline. A bare caret destination takes no space.
    pub fn render_link_ref_def(&mut self, def: NodeId) {
        let dest = self.link_ref_def_dest(def);
        let line = format!(
            "[{}]:{}{dest}\n",
            self.tree.tokens(def),
            if dest == CARET { "" } else { " " }
        );
        self.write(&line);
    }

    /// The `Link` node of the definition a reference link or image points at.
    pub fn find_link_ref_link(&self, label: &str) -> Option<NodeId> {
        let link = self
            .tree
            .find_link_ref_def(label)
            .and_then(|def| self.tree.first_child(def));
        if link.is_none() {
            tracing::debug!(label, "Undefined link reference");
        }
        link
    }

    /// Tokens of the first child of `node` with `kind`, or an empty string.
    pub fn child_tokens(&self, node: NodeId, kind: NodeKind) -> String {
        self.tree
            .child_by_kind(node, kind)
            .map(|c| self.tree.tokens(c).to_owned())
            .unwrap_or_default()
    }

    /// Destination of a link or image. Reference links without a destination of their own
    /// take their definition's.
    pub fn link_dest(&self, link: NodeId) -> String {
        if let Some(dest) = self.tree.child_by_kind(link, NodeKind::LinkDest) {
            return self.tree.tokens(dest).to_owned();
        }
        let node = self.tree.node(link);
        if node.link_type == LinkType::Reference
            && let Some(def_link) = self.find_link_ref_link(&node.link_ref_label)
        {
            return self.child_tokens(def_link, NodeKind::LinkDest);
        }
        String::new()
    }

    // Auto space

    /// Text tokens with spaces between CJK and Latin runs when `auto_space` is on.
    pub fn spaced(&self, tokens: &str) -> String {
        if self.options.auto_space {
            space_text(tokens)
        } else {
            tokens.to_owned()
        }
    }

    /// Write a space between the previous text sibling and `node`'s first text child.
    pub fn text_auto_space_previous(&mut self, node: NodeId) {
        self.auto_space_previous(node, NodeKind::Text);
    }

    /// Write a space between `node`'s first text child and the next text sibling.
    pub fn text_auto_space_next(&mut self, node: NodeId) {
        self.auto_space_next(node, NodeKind::Text);
    }

    /// Like [`text_auto_space_previous`](Self::text_auto_space_previous) for link text.
    pub fn link_text_auto_space_previous(&mut self, node: NodeId) {
        self.auto_space_previous(node, NodeKind::LinkText);
    }

    /// Like [`text_auto_space_next`](Self::text_auto_space_next) for link text.
    pub fn link_text_auto_space_next(&mut self, node: NodeId) {
        self.auto_space_next(node, NodeKind::LinkText);
    }

    fn auto_space_previous(&mut self, node: NodeId, text_kind: NodeKind) {
        if !self.options.auto_space {
            return;
        }
        let Some(text) = self.tree.child_by_kind(node, text_kind) else {
            return;
        };
        let Some(prev) = self.tree.prev(node).filter(|&p| self.kind(p) == NodeKind::Text) else {
            return;
        };
        let last = self.tree.tokens(prev).chars().next_back();
        let first = self.tree.tokens(text).chars().next();
        if let (Some(last), Some(first)) = (last, first)
            && allow_space(last, first)
        {
            self.write_char(' ');
        }
    }

    fn auto_space_next(&mut self, node: NodeId, text_kind: NodeKind) {
        if !self.options.auto_space {
            return;
        }
        let Some(text) = self.tree.child_by_kind(node, text_kind) else {
            return;
        };
        let Some(next) = self.tree.next(node).filter(|&n| self.kind(n) == NodeKind::Text) else {
            return;
        };
        let last = self.tree.tokens(text).chars().next_back();
        let first = self.tree.tokens(next).chars().next();
        if let (Some(last), Some(first)) = (last, first)
            && allow_space(last, first)
        {
            self.write_char(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caret_ast::FixedIdGenerator;
    use pretty_assertions::assert_eq;

    /// Records every handler call.
    struct Trace;

    impl RenderBackend for Trace {
        const NAME: &'static str = "trace";
        type State = ();

        fn render_node(r: &mut Renderer<'_, Self>, node: NodeId, entering: bool) -> Walk {
            let kind = r.kind(node);
            let mark = if entering { "+" } else { "-" };
            r.write(&format!("{mark}{}", kind.name().trim_start_matches("Node")));
            match kind {
                NodeKind::Paragraph if entering && r.tokens(node) == "grow" => {
                    let extra = r.tree.new_text_node(NodeKind::Paragraph, "");
                    r.tree.insert_after(node, extra);
                    Walk::Continue
                }
                NodeKind::Blockquote => Walk::SkipChildren,
                _ => Walk::Continue,
            }
        }
    }

    fn render(tree: &mut Tree) -> String {
        Renderer::<Trace>::new(tree, RenderOptions::default())
            .unwrap()
            .with_id_generator(FixedIdGenerator::default())
            .render()
    }

    #[test]
    fn test_walk_order() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        tree.append(p, NodeKind::Text, "a");
        assert_eq!(render(&mut tree), "+Document+Paragraph+Text-Text-Paragraph-Document");
    }

    #[test]
    fn test_skip_children_still_leaves() {
        let mut tree = Tree::new();
        let root = tree.root();
        let bq = tree.append(root, NodeKind::Blockquote, "");
        tree.append(bq, NodeKind::Paragraph, "");
        assert_eq!(render(&mut tree), "+Document+Blockquote-Blockquote-Document");
    }

    #[test]
    fn test_inserted_sibling_is_walked() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.append(root, NodeKind::Paragraph, "grow");
        assert_eq!(
            render(&mut tree),
            "+Document+Paragraph-Paragraph+Paragraph-Paragraph-Document"
        );
    }

    #[test]
    fn test_tags_disabled() {
        let mut tree = Tree::new();
        let mut r = Renderer::<Trace>::new(&mut tree, RenderOptions::default()).unwrap();
        r.disable_tags();
        r.tag("b", &[("x", "1")], false);
        r.write("text");
        r.enable_tags();
        r.tag("br", &[] as &[(&str, &str)], true);
        assert_eq!(r.out.into_string(), "text<br />");
    }

    #[test]
    fn test_node_id_prefers_ial() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        let q = tree.append(root, NodeKind::Paragraph, "");
        let li = tree.append(root, NodeKind::ListItem, "");
        tree.node_mut(p).set_ial_attr("id", "own");
        let r = Renderer::<Trace>::new(&mut tree, RenderOptions::default())
            .unwrap()
            .with_id_generator(FixedIdGenerator::default());
        assert_eq!(r.node_id(p), "own");
        assert_eq!(r.node_id(q), FixedIdGenerator::TEST_ID);
        assert_eq!(r.node_id(li), FixedIdGenerator::TEST_ID);
    }

    #[test]
    fn test_table_cell_rule() {
        let mut tree = Tree::new();
        let root = tree.root();
        let empty = tree.append(root, NodeKind::TableCell, "");
        let caret = tree.append(root, NodeKind::TableCell, "");
        let caret_text = tree.append(caret, NodeKind::Text, CARET);
        let padded = tree.append(root, NodeKind::TableCell, "");
        let padded_text = tree.append(padded, NodeKind::Text, "  x ");
        let mut r = Renderer::<Trace>::new(&mut tree, RenderOptions::default()).unwrap();
        r.prepare_table_cell(empty);
        r.prepare_table_cell(caret);
        r.prepare_table_cell(padded);
        let only = r.tree.first_child(empty).unwrap();
        assert_eq!(r.tree.tokens(only), " ");
        assert_eq!(r.tree.tokens(caret_text), "‸ ");
        assert_eq!(r.tree.tokens(padded_text), "x");
    }

    #[test]
    fn test_footnote_tooltip_truncates_before_escaping() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.append(root, NodeKind::FootnotesDefBlock, "");
        let def = tree.append(block, NodeKind::FootnotesDef, "^1");
        let p = tree.append(def, NodeKind::Paragraph, "");
        tree.append(p, NodeKind::Text, format!("{CARET}{}", "&".repeat(30)));
        let r = Renderer::<Trace>::new(&mut tree, RenderOptions::default()).unwrap();
        assert_eq!(r.footnote_tooltip(Some(def)), "&amp;".repeat(24));
        assert_eq!(r.footnote_tooltip(None), "");
    }

    #[test]
    fn test_footnote_defs_render_once_and_are_restored() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.append(root, NodeKind::FootnotesDefBlock, "");
        let a = tree.append(block, NodeKind::FootnotesDef, "^a");
        let dup = tree.append(block, NodeKind::FootnotesDef, "^A");
        tree.register_footnote_def(a);
        tree.register_footnote_def(dup);
        let mut r = Renderer::<Trace>::new(&mut tree, RenderOptions::default()).unwrap();
        r.render_footnote_defs();
        assert_eq!(r.out.into_string(), "+FootnotesDef-FootnotesDef");
        assert_eq!(tree.parent(a), Some(block));
        assert_eq!(tree.next(a), Some(dup));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut tree = Tree::new();
        let options = RenderOptions {
            node_index_start: -5,
            ..RenderOptions::default()
        };
        assert!(Renderer::<Trace>::new(&mut tree, options).is_err());
    }
}
