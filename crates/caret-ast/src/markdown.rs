//! Build a [`Tree`] from Markdown using `pulldown-cmark`.
//!
//! pulldown-cmark reports containers and leaf text; the renderers expect the marker-level
//! structure an editor works with (open and close markers, link brackets and parens, fence
//! parts). The builder rebuilds those parts from the event stream and the source ranges.

use std::collections::HashSet;
use std::ops::Range;

use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, LinkType as CmarkLinkType, MetadataBlockKind, Options,
    Parser, Tag,
};

use crate::{Align, LinkType, ListKind, NodeId, NodeKind, Tree, sanitize_ial};

/// Parser options used for intake.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_SUPERSCRIPT
        | Options::ENABLE_SUBSCRIPT
}

/// Parse Markdown into a tree.
///
/// # Example
///
/// ```
/// use caret_ast::{NodeKind, parse_markdown};
///
/// let tree = parse_markdown("Hello *world*");
/// let para = tree.first_child(tree.root()).unwrap();
/// assert_eq!(tree.kind(para), NodeKind::Paragraph);
/// assert_eq!(tree.text(para), "Hello world");
/// ```
#[must_use]
pub fn parse_markdown(markdown: &str) -> Tree {
    let mut builder = TreeBuilder::new(markdown);
    let mut events = Parser::new_ext(markdown, parser_options()).into_offset_iter();
    for (event, range) in events.by_ref() {
        builder.event(event, range);
    }
    let mut defs: Vec<(usize, String, String, String)> = events
        .reference_definitions()
        .iter()
        .map(|(label, def)| {
            let title = def.title.as_ref().map(ToString::to_string).unwrap_or_default();
            (def.span.start, label.to_owned(), def.dest.to_string(), title)
        })
        .collect();
    defs.sort_by_key(|d| d.0);
    for (_, label, dest, title) in defs {
        builder.link_ref_def(&label, dest, title);
    }
    builder.finish()
}

/// Work to do when a container closes.
enum Close {
    Plain,
    Paragraph,
    List,
    Marker(NodeKind, &'static str),
    Link { dest: String, title: String },
    Heading(Option<String>),
    CodeFence(Option<String>),
    FrontMatter(&'static str),
    /// A frame that reuses its parent as the container.
    Transparent,
}

struct Frame {
    id: NodeId,
    /// Opened by the builder rather than by an event.
    implicit: bool,
    close: Close,
}

struct TreeBuilder<'a> {
    source: &'a str,
    tree: Tree,
    stack: Vec<Frame>,
    footnote_defs: Vec<NodeId>,
    implicit_paragraphs: HashSet<NodeId>,
    table_aligns: Vec<Alignment>,
    cell_index: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tree: Tree::new(),
            stack: Vec::new(),
            footnote_defs: Vec::new(),
            implicit_paragraphs: HashSet::new(),
            table_aligns: Vec::new(),
            cell_index: 0,
        }
    }

    fn slice(&self, range: &Range<usize>) -> &'a str {
        self.source.get(range.clone()).unwrap_or("")
    }

    fn current(&self) -> NodeId {
        self.stack.last().map_or(self.tree.root(), |f| f.id)
    }

    fn open(&mut self, kind: NodeKind, close: Close) -> NodeId {
        let id = self.tree.new_node(kind);
        let parent = self.current();
        self.tree.append_child(parent, id);
        self.stack.push(Frame {
            id,
            implicit: false,
            close,
        });
        id
    }

    fn leaf(&mut self, kind: NodeKind, tokens: impl Into<String>) -> NodeId {
        let parent = self.current();
        self.tree.append(parent, kind, tokens)
    }

    fn close_implicit_paragraph(&mut self) {
        while self
            .stack
            .last()
            .is_some_and(|f| f.implicit && self.tree.kind(f.id) == NodeKind::Paragraph)
        {
            self.pop_frame();
        }
    }

    fn ensure_inline_container(&mut self) {
        if self.tree.kind(self.current()) == NodeKind::ListItem {
            let id = self.tree.new_node(NodeKind::Paragraph);
            let parent = self.current();
            self.tree.append_child(parent, id);
            self.implicit_paragraphs.insert(id);
            self.stack.push(Frame {
                id,
                implicit: true,
                close: Close::Paragraph,
            });
        }
    }

    fn event(&mut self, event: Event<'a>, range: Range<usize>) {
        match event {
            Event::Start(tag) => {
                if is_block_tag(&tag) {
                    self.close_implicit_paragraph();
                }
                self.start(tag, &range);
            }
            Event::End(_) => {
                while self.stack.last().is_some_and(|f| f.implicit) {
                    self.pop_frame();
                }
                self.pop_frame();
            }
            Event::Text(text) => self.text(&text, &range),
            Event::Code(code) => {
                self.ensure_inline_container();
                let src = self.slice(&range);
                let marker_len = src.chars().take_while(|&c| c == '`').count().max(1);
                let marker = "`".repeat(marker_len);
                let span = self.open(NodeKind::CodeSpan, Close::Plain);
                self.tree.node_mut(span).code_marker_len = marker_len;
                self.leaf(NodeKind::CodeSpanOpenMarker, marker.clone());
                self.leaf(NodeKind::CodeSpanContent, code.as_ref());
                self.leaf(NodeKind::CodeSpanCloseMarker, marker);
                self.stack.pop();
            }
            Event::InlineMath(math) => {
                self.ensure_inline_container();
                let span = self.open(NodeKind::InlineMath, Close::Plain);
                self.tree.node_mut(span).code_marker_len = 1;
                self.leaf(NodeKind::InlineMathOpenMarker, "$");
                self.leaf(NodeKind::InlineMathContent, math.as_ref());
                self.leaf(NodeKind::InlineMathCloseMarker, "$");
                self.stack.pop();
            }
            Event::DisplayMath(math) => {
                self.ensure_inline_container();
                self.open(NodeKind::MathBlock, Close::Plain);
                self.leaf(NodeKind::MathBlockOpenMarker, "$$");
                self.leaf(NodeKind::MathBlockContent, math.trim());
                self.leaf(NodeKind::MathBlockCloseMarker, "$$");
                self.stack.pop();
            }
            Event::Html(html) => {
                let current = self.current();
                if self.tree.kind(current) == NodeKind::HtmlBlock {
                    self.tree.node_mut(current).tokens.push_str(&html);
                } else {
                    self.ensure_inline_container();
                    self.leaf(NodeKind::InlineHtml, html.as_ref());
                }
            }
            Event::InlineHtml(html) => {
                self.ensure_inline_container();
                self.leaf(NodeKind::InlineHtml, html.as_ref());
            }
            Event::FootnoteReference(label) => {
                self.ensure_inline_container();
                let label = format!("^{label}");
                let id = self.leaf(NodeKind::FootnotesRef, label.clone());
                self.tree.node_mut(id).footnotes_ref_label = label;
            }
            Event::SoftBreak => {
                self.ensure_inline_container();
                self.leaf(NodeKind::SoftBreak, "\n");
            }
            Event::HardBreak => {
                self.ensure_inline_container();
                self.leaf(NodeKind::HardBreak, "\n");
            }
            Event::Rule => {
                self.close_implicit_paragraph();
                let tokens = self.slice(&range).trim().to_owned();
                self.leaf(NodeKind::ThematicBreak, tokens);
            }
            Event::TaskListMarker(checked) => self.task_marker(checked),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start(&mut self, tag: Tag<'a>, range: &Range<usize>) {
        let src = self.slice(range);
        match tag {
            Tag::Paragraph => {
                self.open(NodeKind::Paragraph, Close::Paragraph);
            }
            Tag::Heading {
                level,
                id,
                classes,
                attrs,
            } => {
                let heading = self.open(NodeKind::Heading, Close::Heading(id.map(|i| i.to_string())));
                let node = self.tree.node_mut(heading);
                node.heading_level = level as u8;
                node.heading_setext = !src.trim_start().starts_with('#');
                let mut ial = Vec::new();
                if !classes.is_empty() {
                    let classes: Vec<&str> = classes.iter().map(AsRef::as_ref).collect();
                    ial.push(("class".to_owned(), classes.join(" ")));
                }
                for (key, value) in attrs {
                    ial.push((key.to_string(), value.map(|v| v.to_string()).unwrap_or_default()));
                }
                node.ial = sanitize_ial(ial);
            }
            Tag::BlockQuote(_) => {
                self.open(NodeKind::Blockquote, Close::Plain);
                self.leaf(NodeKind::BlockquoteMarker, ">");
            }
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let trimmed = src.trim_start();
                let fence_char = if trimmed.starts_with('~') { '~' } else { '`' };
                let fence: String = trimmed.chars().take_while(|&c| c == fence_char).collect();
                let block = self.open(NodeKind::CodeBlock, Close::CodeFence(Some(fence.clone())));
                self.tree.node_mut(block).fenced = true;
                self.leaf(NodeKind::CodeBlockFenceOpenMarker, fence);
                let info_node = self.leaf(NodeKind::CodeBlockFenceInfoMarker, info.as_ref());
                self.tree.node_mut(info_node).code_block_info = info.to_string();
                self.leaf(NodeKind::CodeBlockCode, "");
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => {
                self.open(NodeKind::CodeBlock, Close::CodeFence(None));
                self.leaf(NodeKind::CodeBlockCode, "");
            }
            Tag::HtmlBlock => {
                self.open(NodeKind::HtmlBlock, Close::Plain);
            }
            Tag::List(start) => {
                let list = self.open(NodeKind::List, Close::List);
                let marker = list_marker(src);
                let data = &mut self.tree.node_mut(list).list;
                if let Some(start) = start {
                    data.kind = ListKind::Ordered;
                    data.start = u32::try_from(start).unwrap_or(u32::MAX);
                    data.delimiter = marker.chars().last();
                } else {
                    data.bullet_char = marker.chars().next();
                }
                data.tight = true;
            }
            Tag::Item => {
                let list = self.current();
                let index = self
                    .tree
                    .children(list)
                    .filter(|&c| self.tree.kind(c) == NodeKind::ListItem)
                    .count();
                let mut data = self.tree.node(list).list.clone();
                let item = self.open(NodeKind::ListItem, Close::Plain);
                if data.kind == ListKind::Ordered {
                    data.num = data.start + u32::try_from(index).unwrap_or(0);
                    let delimiter = data.delimiter.unwrap_or('.');
                    data.marker = format!("{}{delimiter}", data.num);
                } else {
                    data.marker = data.bullet_char.unwrap_or('*').to_string();
                }
                self.tree.node_mut(item).list = data;
            }
            Tag::FootnoteDefinition(label) => {
                let def = self.tree.new_text_node(NodeKind::FootnotesDef, format!("^{label}"));
                self.tree.register_footnote_def(def);
                self.footnote_defs.push(def);
                self.stack.push(Frame {
                    id: def,
                    implicit: false,
                    close: Close::Plain,
                });
            }
            Tag::Table(aligns) => {
                self.table_aligns = aligns;
                self.open(NodeKind::Table, Close::Plain);
            }
            Tag::TableHead => {
                self.open(NodeKind::TableHead, Close::Plain);
                let row = self.tree.new_node(NodeKind::TableRow);
                let head = self.current();
                self.tree.append_child(head, row);
                self.stack.push(Frame {
                    id: row,
                    implicit: true,
                    close: Close::Plain,
                });
                self.cell_index = 0;
            }
            Tag::TableRow => {
                self.open(NodeKind::TableRow, Close::Plain);
                self.cell_index = 0;
            }
            Tag::TableCell => {
                let align = match self.table_aligns.get(self.cell_index) {
                    Some(Alignment::Left) => Align::Left,
                    Some(Alignment::Center) => Align::Center,
                    Some(Alignment::Right) => Align::Right,
                    Some(Alignment::None) | None => Align::None,
                };
                self.cell_index += 1;
                let cell = self.open(NodeKind::TableCell, Close::Plain);
                self.tree.node_mut(cell).table_cell_align = align;
            }
            Tag::Emphasis => {
                self.ensure_inline_container();
                let (open, close, marker) = if src.starts_with('_') {
                    (NodeKind::EmU8eOpenMarker, NodeKind::EmU8eCloseMarker, "_")
                } else {
                    (NodeKind::EmA6kOpenMarker, NodeKind::EmA6kCloseMarker, "*")
                };
                self.open(NodeKind::Emphasis, Close::Marker(close, marker));
                self.leaf(open, marker);
            }
            Tag::Strong => {
                self.ensure_inline_container();
                let (open, close, marker) = if src.starts_with("__") {
                    (NodeKind::StrongU8eOpenMarker, NodeKind::StrongU8eCloseMarker, "__")
                } else {
                    (NodeKind::StrongA6kOpenMarker, NodeKind::StrongA6kCloseMarker, "**")
                };
                self.open(NodeKind::Strong, Close::Marker(close, marker));
                self.leaf(open, marker);
            }
            Tag::Strikethrough => {
                self.ensure_inline_container();
                let (open, close, marker) = if src.starts_with("~~") {
                    (
                        NodeKind::Strikethrough2OpenMarker,
                        NodeKind::Strikethrough2CloseMarker,
                        "~~",
                    )
                } else {
                    (
                        NodeKind::Strikethrough1OpenMarker,
                        NodeKind::Strikethrough1CloseMarker,
                        "~",
                    )
                };
                self.open(NodeKind::Strikethrough, Close::Marker(close, marker));
                self.leaf(open, marker);
            }
            Tag::Superscript => {
                self.ensure_inline_container();
                self.open(NodeKind::Sup, Close::Marker(NodeKind::SupCloseMarker, "^"));
                self.leaf(NodeKind::SupOpenMarker, "^");
            }
            Tag::Subscript => {
                self.ensure_inline_container();
                self.open(NodeKind::Sub, Close::Marker(NodeKind::SubCloseMarker, "~"));
                self.leaf(NodeKind::SubOpenMarker, "~");
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => {
                self.ensure_inline_container();
                let link = self.open(
                    NodeKind::Link,
                    Close::Link {
                        dest: dest_url.to_string(),
                        title: title.to_string(),
                    },
                );
                let node = self.tree.node_mut(link);
                node.link_type = map_link_type(link_type);
                if node.link_type == LinkType::Reference {
                    node.link_ref_label = id.to_string();
                }
                self.leaf(NodeKind::OpenBracket, "[");
            }
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => {
                self.ensure_inline_container();
                let image = self.open(
                    NodeKind::Image,
                    Close::Link {
                        dest: dest_url.to_string(),
                        title: title.to_string(),
                    },
                );
                let node = self.tree.node_mut(image);
                node.link_type = map_link_type(link_type);
                if node.link_type == LinkType::Reference {
                    node.link_ref_label = id.to_string();
                }
                self.leaf(NodeKind::Bang, "!");
                self.leaf(NodeKind::OpenBracket, "[");
            }
            Tag::MetadataBlock(kind) => {
                let fence = match kind {
                    MetadataBlockKind::YamlStyle => "---",
                    MetadataBlockKind::PlusesStyle => "+++",
                };
                self.open(NodeKind::YamlFrontMatter, Close::FrontMatter(fence));
                self.leaf(NodeKind::YamlFrontMatterOpenMarker, fence);
                self.leaf(NodeKind::YamlFrontMatterContent, "");
            }
            Tag::DefinitionList | Tag::DefinitionListTitle | Tag::DefinitionListDefinition => {
                let id = self.current();
                self.stack.push(Frame {
                    id,
                    implicit: false,
                    close: Close::Transparent,
                });
            }
        }
    }

    fn pop_frame(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame.close {
            Close::Plain | Close::Transparent => {}
            Close::Paragraph => self.unwrap_display_math(frame.id),
            Close::List => self.finish_list(frame.id),
            Close::Marker(kind, marker) => {
                self.tree.append(frame.id, kind, marker);
            }
            Close::Link { dest, title } => {
                self.tree.append(frame.id, NodeKind::CloseBracket, "]");
                self.tree.append(frame.id, NodeKind::OpenParen, "(");
                self.tree.append(frame.id, NodeKind::LinkDest, dest);
                if !title.is_empty() {
                    self.tree.append(frame.id, NodeKind::LinkSpace, " ");
                    self.tree.append(frame.id, NodeKind::LinkTitle, title);
                }
                self.tree.append(frame.id, NodeKind::CloseParen, ")");
            }
            Close::Heading(id) => {
                if let Some(id) = id {
                    self.tree.append(frame.id, NodeKind::HeadingId, id);
                }
            }
            Close::CodeFence(fence) => {
                if let Some(code) = self.tree.child_by_kind(frame.id, NodeKind::CodeBlockCode) {
                    let tokens = &mut self.tree.node_mut(code).tokens;
                    if tokens.ends_with('\n') {
                        tokens.pop();
                    }
                }
                if let Some(fence) = fence {
                    self.tree
                        .append(frame.id, NodeKind::CodeBlockFenceCloseMarker, fence);
                }
            }
            Close::FrontMatter(fence) => {
                if let Some(content) =
                    self.tree.child_by_kind(frame.id, NodeKind::YamlFrontMatterContent)
                {
                    let tokens = &mut self.tree.node_mut(content).tokens;
                    let trimmed = tokens.trim_end_matches('\n').len();
                    tokens.truncate(trimmed);
                }
                self.tree
                    .append(frame.id, NodeKind::YamlFrontMatterCloseMarker, fence);
            }
        }
        if self.tree.kind(frame.id) == NodeKind::HtmlBlock {
            let tokens = &mut self.tree.node_mut(frame.id).tokens;
            let trimmed = tokens.trim_end_matches('\n').len();
            tokens.truncate(trimmed);
        }
    }

    /// A paragraph holding nothing but `$$...$$` becomes a math block.
    fn unwrap_display_math(&mut self, paragraph: NodeId) {
        let Some(only) = self.tree.first_child(paragraph) else {
            return;
        };
        if self.tree.next(only).is_none() && self.tree.kind(only) == NodeKind::MathBlock {
            self.tree.insert_after(paragraph, only);
            self.tree.unlink(paragraph);
        }
    }

    fn finish_list(&mut self, list: NodeId) {
        let items: Vec<NodeId> = self.tree.children(list).collect();
        let tight = items.iter().all(|&item| {
            self.tree.children(item).all(|c| {
                self.tree.kind(c) != NodeKind::Paragraph || self.implicit_paragraphs.contains(&c)
            })
        });
        self.tree.node_mut(list).list.tight = tight;
        for item in items {
            self.tree.node_mut(item).list.tight = tight;
        }
    }

    fn task_marker(&mut self, checked: bool) {
        let Some(item) = self
            .stack
            .iter()
            .rev()
            .map(|f| f.id)
            .find(|&id| self.tree.kind(id) == NodeKind::ListItem)
        else {
            return;
        };
        let marker = self
            .tree
            .new_text_node(NodeKind::TaskListItemMarker, if checked { "[x]" } else { "[ ]" });
        self.tree.node_mut(marker).task_checked = checked;
        let current = self.current();
        if current != item && self.tree.parent(current) == Some(item) {
            self.tree.insert_before(current, marker);
        } else {
            self.tree.append_child(item, marker);
        }
        let node = self.tree.node_mut(item);
        node.list.kind = ListKind::Task;
        node.task_checked = checked;
        if let Some(list) = self.tree.parent(item) {
            self.tree.node_mut(list).list.kind = ListKind::Task;
        }
    }

    fn text(&mut self, text: &str, range: &Range<usize>) {
        let current = self.current();
        match self.tree.kind(current) {
            NodeKind::CodeBlock => {
                if let Some(code) = self.tree.child_by_kind(current, NodeKind::CodeBlockCode) {
                    self.tree.node_mut(code).tokens.push_str(text);
                }
                return;
            }
            NodeKind::YamlFrontMatter => {
                if let Some(content) =
                    self.tree.child_by_kind(current, NodeKind::YamlFrontMatterContent)
                {
                    self.tree.node_mut(content).tokens.push_str(text);
                }
                return;
            }
            NodeKind::HtmlBlock => {
                self.tree.node_mut(current).tokens.push_str(text);
                return;
            }
            _ => {}
        }

        self.ensure_inline_container();
        let src = self.slice(range);
        if src.len() > 2 && src.starts_with('&') && src.ends_with(';') && src != text {
            let entity = self.leaf(NodeKind::HtmlEntity, text);
            self.tree.node_mut(entity).html_entity_tokens = src.to_owned();
            return;
        }
        if src.len() == text.len() + 1 && src.starts_with('\\') && src[1..] == *text {
            self.open(NodeKind::Backslash, Close::Plain);
            self.leaf(NodeKind::BackslashContent, text);
            self.stack.pop();
            return;
        }

        let container = self.current();
        let kind = if matches!(self.tree.kind(container), NodeKind::Link | NodeKind::Image) {
            NodeKind::LinkText
        } else {
            NodeKind::Text
        };
        if let Some(last) = self.tree.last_child(container)
            && self.tree.kind(last) == kind
        {
            self.tree.node_mut(last).tokens.push_str(text);
            return;
        }
        self.leaf(kind, text);
    }

    /// Append a reference definition to the trailing definitions block.
    fn link_ref_def(&mut self, label: &str, dest: String, title: String) {
        let root = self.tree.root();
        let block = match self.tree.last_child(root) {
            Some(last) if self.tree.kind(last) == NodeKind::LinkRefDefBlock => last,
            _ => self.tree.append(root, NodeKind::LinkRefDefBlock, ""),
        };
        let def = self.tree.append(block, NodeKind::LinkRefDef, label);
        self.tree.register_link_ref_def(label, def);
        let link = self.tree.append(def, NodeKind::Link, "");
        self.tree.node_mut(link).link_type = LinkType::RefDef;
        self.tree.append(link, NodeKind::OpenBracket, "[");
        self.tree.append(link, NodeKind::LinkText, label);
        self.tree.append(link, NodeKind::CloseBracket, "]");
        self.tree.append(link, NodeKind::LinkDest, dest);
        if !title.is_empty() {
            self.tree.append(link, NodeKind::LinkSpace, " ");
            self.tree.append(link, NodeKind::LinkTitle, title);
        }
    }

    fn finish(mut self) -> Tree {
        while !self.stack.is_empty() {
            self.pop_frame();
        }
        if !self.footnote_defs.is_empty() {
            let root = self.tree.root();
            let block = self.tree.append(root, NodeKind::FootnotesDefBlock, "");
            for def in std::mem::take(&mut self.footnote_defs) {
                self.tree.append_child(block, def);
            }
        }
        assign_footnote_ids(&mut self.tree);
        tracing::debug!(nodes = self.tree.len(), "built tree from markdown");
        self.tree
    }
}

/// Number definitions by ordinal and references by `ordinal:occurrence`.
fn assign_footnote_ids(tree: &mut Tree) {
    let defs: Vec<NodeId> = tree.footnote_defs().to_vec();
    for (i, def) in defs.into_iter().enumerate() {
        tree.node_mut(def).footnotes_ref_id = (i + 1).to_string();
    }
    let mut seen: Vec<(usize, usize)> = Vec::new();
    for id in tree.descendants(tree.root()) {
        if tree.kind(id) != NodeKind::FootnotesRef {
            continue;
        }
        let ref_id = match tree.find_footnote_def(tree.tokens(id)) {
            Some((ordinal, _)) => {
                let occurrence = match seen.iter_mut().find(|(o, _)| *o == ordinal) {
                    Some(entry) => {
                        entry.1 += 1;
                        entry.1
                    }
                    None => {
                        seen.push((ordinal, 1));
                        1
                    }
                };
                format!("{ordinal}:{occurrence}")
            }
            None => tree.tokens(id).trim_start_matches('^').to_owned(),
        };
        tree.node_mut(id).footnotes_ref_id = ref_id;
    }
}

fn is_block_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading { .. }
            | Tag::BlockQuote(_)
            | Tag::CodeBlock(_)
            | Tag::HtmlBlock
            | Tag::List(_)
            | Tag::Item
            | Tag::FootnoteDefinition(_)
            | Tag::Table(_)
            | Tag::MetadataBlock(_)
    )
}

/// Marker of the first item of a list: `*`, `-`, `+`, or digits plus `.`/`)`.
fn list_marker(src: &str) -> String {
    let trimmed = src.trim_start();
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        trimmed.chars().take(1).collect()
    } else {
        let delimiter = trimmed[digits.len()..].chars().next().unwrap_or('.');
        format!("{digits}{delimiter}")
    }
}

fn map_link_type(link_type: CmarkLinkType) -> LinkType {
    match link_type {
        CmarkLinkType::Reference
        | CmarkLinkType::ReferenceUnknown
        | CmarkLinkType::Collapsed
        | CmarkLinkType::CollapsedUnknown
        | CmarkLinkType::Shortcut
        | CmarkLinkType::ShortcutUnknown => LinkType::Reference,
        CmarkLinkType::Autolink | CmarkLinkType::Email => LinkType::Autolink,
        _ => LinkType::Inline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn child_kinds(tree: &Tree, id: NodeId) -> Vec<NodeKind> {
        tree.children(id).map(|c| tree.kind(c)).collect()
    }

    fn first_block(tree: &Tree) -> NodeId {
        tree.first_child(tree.root()).unwrap()
    }

    #[test]
    fn test_emphasis_markers() {
        let tree = parse_markdown("*a* __b__");
        let para = first_block(&tree);
        let em = tree.first_child(para).unwrap();
        assert_eq!(
            child_kinds(&tree, em),
            vec![NodeKind::EmA6kOpenMarker, NodeKind::Text, NodeKind::EmA6kCloseMarker]
        );
        let strong = tree.last_child(para).unwrap();
        assert_eq!(tree.kind(strong), NodeKind::Strong);
        assert_eq!(
            tree.kind(tree.first_child(strong).unwrap()),
            NodeKind::StrongU8eOpenMarker
        );
    }

    #[test]
    fn test_heading_level_and_id() {
        let tree = parse_markdown("## Title {#custom}");
        let heading = first_block(&tree);
        assert_eq!(tree.node(heading).heading_level, 2);
        assert!(!tree.node(heading).heading_setext);
        let id = tree.child_by_kind(heading, NodeKind::HeadingId).unwrap();
        assert_eq!(tree.tokens(id), "custom");
    }

    #[test]
    fn test_heading_attribute_values_escaped() {
        let tree = parse_markdown("# T {.a data-x=a\"onmouseover=alert(1)}\n");
        let heading = first_block(&tree);
        let node = tree.node(heading);
        assert_eq!(node.ial_attr("class"), Some("a"));
        assert_eq!(node.ial_attr("data-x"), Some("a&quot;onmouseover=alert(1)"));
        assert!(node.ial.iter().all(|(k, v)| !k.contains('"') && !v.contains('"')));
    }

    #[test]
    fn test_fenced_code_block_parts() {
        let tree = parse_markdown("```rust\nfn main() {}\n```");
        let block = first_block(&tree);
        assert_eq!(
            child_kinds(&tree, block),
            vec![
                NodeKind::CodeBlockFenceOpenMarker,
                NodeKind::CodeBlockFenceInfoMarker,
                NodeKind::CodeBlockCode,
                NodeKind::CodeBlockFenceCloseMarker,
            ]
        );
        let info = tree.child_by_kind(block, NodeKind::CodeBlockFenceInfoMarker).unwrap();
        assert_eq!(tree.node(info).code_block_info, "rust");
        let code = tree.child_by_kind(block, NodeKind::CodeBlockCode).unwrap();
        assert_eq!(tree.tokens(code), "fn main() {}");
    }

    #[test]
    fn test_tight_list_gets_paragraphs() {
        let tree = parse_markdown("- one\n- two");
        let list = first_block(&tree);
        assert!(tree.node(list).list.tight);
        let item = tree.first_child(list).unwrap();
        assert_eq!(child_kinds(&tree, item), vec![NodeKind::Paragraph]);
        assert_eq!(tree.node(item).list.marker, "-");
    }

    #[test]
    fn test_loose_ordered_list() {
        let tree = parse_markdown("3. one\n\n4. two");
        let list = first_block(&tree);
        assert!(!tree.node(list).list.tight);
        assert_eq!(tree.node(list).list.kind, ListKind::Ordered);
        let second = tree.last_child(list).unwrap();
        assert_eq!(tree.node(second).list.marker, "4.");
        assert_eq!(tree.node(second).list.num, 4);
    }

    #[test]
    fn test_task_list_marker_precedes_paragraph() {
        let tree = parse_markdown("- [x] done");
        let list = first_block(&tree);
        let item = tree.first_child(list).unwrap();
        assert_eq!(
            child_kinds(&tree, item),
            vec![NodeKind::TaskListItemMarker, NodeKind::Paragraph]
        );
        assert!(tree.node(item).task_checked);
        assert_eq!(tree.node(list).list.kind, ListKind::Task);
    }

    #[test]
    fn test_link_parts() {
        let tree = parse_markdown(r#"[text](/dest "title")"#);
        let link = tree.first_child(first_block(&tree)).unwrap();
        assert_eq!(
            child_kinds(&tree, link),
            vec![
                NodeKind::OpenBracket,
                NodeKind::LinkText,
                NodeKind::CloseBracket,
                NodeKind::OpenParen,
                NodeKind::LinkDest,
                NodeKind::LinkSpace,
                NodeKind::LinkTitle,
                NodeKind::CloseParen,
            ]
        );
    }

    #[test]
    fn test_reference_link_keeps_label() {
        let tree = parse_markdown("[text][foo]\n\n[foo]: /url");
        let link = tree.first_child(first_block(&tree)).unwrap();
        assert_eq!(tree.node(link).link_type, LinkType::Reference);
        assert_eq!(tree.node(link).link_ref_label, "foo");
    }

    #[test]
    fn test_link_ref_defs_block() {
        let tree = parse_markdown("[a][foo]\n\n[foo]: /url \"t\"");
        let block = tree.last_child(tree.root()).unwrap();
        assert_eq!(tree.kind(block), NodeKind::LinkRefDefBlock);
        let def = tree.find_link_ref_def("FOO").unwrap();
        let link = tree.first_child(def).unwrap();
        let dest = tree.child_by_kind(link, NodeKind::LinkDest).unwrap();
        assert_eq!(tree.tokens(dest), "/url");
    }

    #[test]
    fn test_table_structure_and_alignment() {
        let tree = parse_markdown("| a | b |\n|:--|--:|\n| 1 | 2 |");
        let table = first_block(&tree);
        assert_eq!(
            child_kinds(&tree, table),
            vec![NodeKind::TableHead, NodeKind::TableRow]
        );
        let head = tree.first_child(table).unwrap();
        let head_row = tree.first_child(head).unwrap();
        let cells: Vec<Align> = tree
            .children(head_row)
            .map(|c| tree.node(c).table_cell_align)
            .collect();
        assert_eq!(cells, vec![Align::Left, Align::Right]);
    }

    #[test]
    fn test_footnotes_are_collected_at_end() {
        let tree = parse_markdown("See[^n].\n\n[^n]: Note.\n\nAfter.");
        let last = tree.last_child(tree.root()).unwrap();
        assert_eq!(tree.kind(last), NodeKind::FootnotesDefBlock);
        let def = tree.first_child(last).unwrap();
        assert_eq!(tree.tokens(def), "^n");
        assert_eq!(tree.node(def).footnotes_ref_id, "1");

        let para = first_block(&tree);
        let reference = tree.child_by_kind(para, NodeKind::FootnotesRef).unwrap();
        assert_eq!(tree.node(reference).footnotes_ref_id, "1:1");
    }

    #[test]
    fn test_display_math_paragraph_becomes_math_block() {
        let tree = parse_markdown("$$x^2$$");
        let block = first_block(&tree);
        assert_eq!(tree.kind(block), NodeKind::MathBlock);
        let content = tree.child_by_kind(block, NodeKind::MathBlockContent).unwrap();
        assert_eq!(tree.tokens(content), "x^2");
    }

    #[test]
    fn test_yaml_front_matter() {
        let tree = parse_markdown("---\ntitle: x\n---\n\nBody");
        let front = first_block(&tree);
        assert_eq!(tree.kind(front), NodeKind::YamlFrontMatter);
        let content = tree.child_by_kind(front, NodeKind::YamlFrontMatterContent).unwrap();
        assert_eq!(tree.tokens(content), "title: x");
    }

    #[test]
    fn test_html_block_tokens() {
        let tree = parse_markdown("<div>\nhi\n</div>");
        let block = first_block(&tree);
        assert_eq!(tree.kind(block), NodeKind::HtmlBlock);
        assert_eq!(tree.tokens(block), "<div>\nhi\n</div>");
    }

    #[test]
    fn test_code_span_parts() {
        let tree = parse_markdown("``a`b``");
        let span = tree.first_child(first_block(&tree)).unwrap();
        assert_eq!(tree.node(span).code_marker_len, 2);
        let content = tree.child_by_kind(span, NodeKind::CodeSpanContent).unwrap();
        assert_eq!(tree.tokens(content), "a`b");
    }
}
