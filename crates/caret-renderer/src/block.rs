//! Block editor DOM.
//!
//! Every block is a `div` carrying `data-node-id`, its canonical `data-type` and merged IAL
//! attributes, followed by the attribute panel. Top-level blocks are numbered through
//! `data-node-index`. Unlike the export DOM the IAL `id` pair is not repeated and code, math and
//! raw HTML keep their source editable.

use caret_ast::{LinkType, ListKind, NodeId, NodeKind};

use crate::code::info_language;
use crate::cursor::{CARET, FRONT_END_CARET, ZWSP, is_empty_content, strip_caret};
use crate::escape::{escape_html, escape_ref_text};
use crate::ial::{Attrs, IdPair, push_attr};
use crate::renderer::{RenderBackend, Renderer, Walk};
use crate::sanitize::is_script_url;

/// Block backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockBackend;

/// Running `data-node-index` of top-level blocks.
#[derive(Debug, Default)]
pub struct BlockState {
    next_index: Option<i64>,
}

type Block<'t> = Renderer<'t, BlockBackend>;

impl RenderBackend for BlockBackend {
    const NAME: &'static str = "block";
    type State = BlockState;

    fn render_node(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
        match r.kind(node) {
            NodeKind::Document
            | NodeKind::HeadingC8hMarker
            | NodeKind::HeadingId
            | NodeKind::BlockquoteMarker
            | NodeKind::CodeBlockFenceOpenMarker
            | NodeKind::CodeBlockFenceInfoMarker
            | NodeKind::CodeBlockFenceCloseMarker
            | NodeKind::MathBlockOpenMarker
            | NodeKind::MathBlockContent
            | NodeKind::MathBlockCloseMarker
            | NodeKind::InlineMath
            | NodeKind::Bang
            | NodeKind::OpenBracket
            | NodeKind::CloseBracket
            | NodeKind::OpenParen
            | NodeKind::CloseParen
            | NodeKind::Less
            | NodeKind::Greater
            | NodeKind::OpenBrace
            | NodeKind::CloseBrace
            | NodeKind::LinkDest
            | NodeKind::LinkTitle
            | NodeKind::LinkSpace
            | NodeKind::YamlFrontMatterOpenMarker
            | NodeKind::YamlFrontMatterCloseMarker
            | NodeKind::BlockRefId
            | NodeKind::BlockRefSpace
            | NodeKind::BlockRefText
            | NodeKind::BlockRefDynamicText
            | NodeKind::BlockQueryEmbedScript
            | NodeKind::KramdownBlockIal
            | NodeKind::KramdownSpanIal
            | NodeKind::SuperBlockOpenMarker
            | NodeKind::SuperBlockLayoutMarker
            | NodeKind::SuperBlockCloseMarker
            | NodeKind::GitConflict
            | NodeKind::GitConflictOpenMarker
            | NodeKind::GitConflictCloseMarker
            | NodeKind::Emoji
            | NodeKind::EmojiAlias
            | NodeKind::CodeSpan
            | NodeKind::Underline
            | NodeKind::Kbd => Walk::Continue,
            NodeKind::Paragraph => {
                editable_block(r, node, entering, Attrs::new(), "p");
                Walk::Continue
            }
            NodeKind::Heading => {
                let level = r.tree.node(node).heading_level.clamp(1, 6);
                let mut attrs = Attrs::new();
                push_attr(&mut attrs, "data-subtype", format!("h{level}"));
                editable_block(r, node, entering, attrs, &format!("h{level}"));
                Walk::Continue
            }
            NodeKind::ThematicBreak => {
                if entering {
                    let mut attrs = Attrs::new();
                    block_attrs(r, &mut attrs, node, "hr");
                    r.tag("div", &attrs, false);
                    r.open_tag("div");
                } else {
                    r.close_tag("div");
                    r.close_tag("div");
                }
                Walk::Continue
            }
            NodeKind::Blockquote => simple_block(r, node, entering, Attrs::new(), "bq"),
            NodeKind::List => {
                let mut attrs = Attrs::new();
                push_attr(&mut attrs, "data-subtype", list_subtype(r.tree.node(node).list.kind));
                simple_block(r, node, entering, attrs, "list")
            }
            NodeKind::ListItem => list_item(r, node, entering),
            NodeKind::TaskListItemMarker => {
                if entering {
                    let mut attrs = Attrs::new();
                    if r.tree.node(node).task_checked {
                        push_attr(&mut attrs, "checked", "");
                    }
                    push_attr(&mut attrs, "type", "checkbox");
                    r.tag("input", &attrs, true);
                }
                Walk::Continue
            }
            NodeKind::Text => {
                if entering {
                    let tokens = r.tokens(node);
                    let tokens = r.spaced(&tokens);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Strikethrough
            | NodeKind::Mark
            | NodeKind::Sup
            | NodeKind::Sub
            | NodeKind::Tag => {
                if entering {
                    r.text_auto_space_previous(node);
                } else {
                    r.text_auto_space_next(node);
                }
                Walk::Continue
            }
            NodeKind::EmA6kOpenMarker | NodeKind::EmU8eOpenMarker => inline_tag(r, entering, "em"),
            NodeKind::EmA6kCloseMarker | NodeKind::EmU8eCloseMarker => {
                inline_tag(r, entering, "/em")
            }
            NodeKind::StrongA6kOpenMarker => {
                if entering {
                    let ial = r.tree.parent(node).map(|p| r.tree.node(p).ial.clone());
                    r.tag("strong", &ial.unwrap_or_default(), false);
                }
                Walk::Continue
            }
            NodeKind::StrongU8eOpenMarker => inline_tag(r, entering, "strong"),
            NodeKind::StrongA6kCloseMarker | NodeKind::StrongU8eCloseMarker => {
                inline_tag(r, entering, "/strong")
            }
            NodeKind::Strikethrough1OpenMarker | NodeKind::Strikethrough2OpenMarker => {
                inline_tag(r, entering, "s")
            }
            NodeKind::Strikethrough1CloseMarker | NodeKind::Strikethrough2CloseMarker => {
                inline_tag(r, entering, "/s")
            }
            NodeKind::Mark1OpenMarker | NodeKind::Mark2OpenMarker => inline_tag(r, entering, "mark"),
            NodeKind::Mark1CloseMarker | NodeKind::Mark2CloseMarker => {
                inline_tag(r, entering, "/mark")
            }
            NodeKind::SupOpenMarker => inline_tag(r, entering, "sup"),
            NodeKind::SupCloseMarker => inline_tag(r, entering, "/sup"),
            NodeKind::SubOpenMarker => inline_tag(r, entering, "sub"),
            NodeKind::SubCloseMarker => inline_tag(r, entering, "/sub"),
            NodeKind::UnderlineOpenMarker => inline_tag(r, entering, "u"),
            NodeKind::UnderlineCloseMarker => inline_tag(r, entering, "/u"),
            NodeKind::KbdOpenMarker => inline_tag(r, entering, "kbd"),
            NodeKind::KbdCloseMarker => inline_tag(r, entering, "/kbd"),
            NodeKind::TagOpenMarker => {
                if entering {
                    r.tag("span", &[("data-type", "tag")], false);
                }
                Walk::Continue
            }
            NodeKind::TagCloseMarker => inline_tag(r, entering, "/span"),
            NodeKind::CodeSpanOpenMarker => inline_tag(r, entering, "code"),
            NodeKind::CodeSpanContent
            | NodeKind::BackslashContent
            | NodeKind::InlineMathContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::CodeSpanCloseMarker => inline_tag(r, entering, "/code"),
            NodeKind::InlineMathOpenMarker => {
                if entering {
                    let content = r.tree.next(node).map(|c| r.tokens(c)).unwrap_or_default();
                    let content = escape_html(&content);
                    r.tag(
                        "span",
                        &[
                            ("data-type", "inline-math"),
                            ("data-content", content.as_str()),
                            ("contenteditable", "false"),
                            ("class", "language-math"),
                        ],
                        false,
                    );
                }
                Walk::Continue
            }
            NodeKind::InlineMathCloseMarker => inline_tag(r, entering, "/span"),
            NodeKind::HardBreak | NodeKind::Br => {
                if entering {
                    r.write("<br />");
                }
                Walk::Continue
            }
            NodeKind::SoftBreak => {
                if entering {
                    r.write_char('\n');
                }
                Walk::Continue
            }
            NodeKind::CodeBlock => simple_block(r, node, entering, Attrs::new(), "code-block"),
            NodeKind::CodeBlockCode => code_block_code(r, node, entering),
            NodeKind::MathBlock => math_block(r, node, entering),
            NodeKind::Table => table(r, node, entering),
            NodeKind::TableHead => {
                if entering {
                    r.open_tag("thead");
                } else {
                    r.close_tag("thead");
                    if r.tree.next(node).is_some() {
                        r.open_tag("tbody");
                    }
                }
                Walk::Continue
            }
            NodeKind::TableRow => inline_tag(r, true, if entering { "tr" } else { "/tr" }),
            NodeKind::TableCell => table_cell(r, node, entering),
            NodeKind::Link => link(r, node, entering),
            NodeKind::Image => image(r, node, entering),
            NodeKind::LinkText => {
                let in_image = r.tree.parent(node).map(|p| r.kind(p)) == Some(NodeKind::Image);
                if entering && !in_image {
                    let tokens = r.tokens(node);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::LinkRefDefBlock => {
                r.write(if entering {
                    r#"<div data-block="0" data-type="link-ref-defs-block">"#
                } else {
                    "</div>"
                });
                Walk::Continue
            }
            NodeKind::LinkRefDef => {
                if entering && r.tree.first_child(node).is_some() {
                    r.render_link_ref_def(node);
                }
                Walk::SkipChildren
            }
            NodeKind::HtmlBlock => {
                if entering {
                    let tokens = r.tokens(node);
                    editable_block(r, node, true, Attrs::new(), "html");
                    r.write("<pre><code>");
                    r.write_escaped(tokens.trim());
                    r.write("</code></pre>");
                } else {
                    editable_block(r, node, false, Attrs::new(), "html");
                }
                Walk::SkipChildren
            }
            NodeKind::InlineHtml => inline_html(r, node, entering),
            NodeKind::HtmlEntity => html_entity(r, node, entering),
            NodeKind::Backslash => {
                r.write(if entering {
                    r#"<span data-type="backslash"><span>\</span>"#
                } else {
                    "</span>"
                });
                Walk::Continue
            }
            NodeKind::EmojiImg | NodeKind::EmojiUnicode => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write(&tokens);
                }
                Walk::SkipChildren
            }
            NodeKind::YamlFrontMatter => {
                r.write(if entering {
                    r#"<div class="protyle-wysiwyg__block" data-type="yaml-front-matter" data-block="0">"#
                } else {
                    "</div>"
                });
                Walk::Continue
            }
            NodeKind::YamlFrontMatterContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.open_tag("pre");
                    r.tag("code", &[("data-type", "yaml-front-matter")], false);
                    if is_empty_content(&tokens) {
                        r.write(FRONT_END_CARET);
                        r.write_char('\n');
                    } else {
                        r.write_escaped(tokens.trim());
                    }
                    r.write("</code></pre>");
                }
                Walk::Continue
            }
            NodeKind::FootnotesDefBlock => {
                if r.rendering_footnotes() {
                    return Walk::SkipChildren;
                }
                if entering {
                    r.write(r#"<div data-block="0" data-type="footnotes-block">"#);
                    r.write(r#"<ol data-type="footnotes-defs-ol">"#);
                    r.render_footnote_defs();
                } else {
                    r.write("</ol></div>");
                }
                Walk::SkipChildren
            }
            NodeKind::FootnotesDef => {
                if entering {
                    let label = escape_html(r.tree.tokens(node));
                    r.tag(
                        "li",
                        &[("data-type", "footnotes-li"), ("data-marker", label.as_str())],
                        false,
                    );
                } else {
                    r.close_tag("li");
                }
                Walk::Continue
            }
            NodeKind::FootnotesRef => footnotes_ref(r, node, entering),
            NodeKind::Toc => {
                if entering {
                    r.render_toc("");
                }
                Walk::SkipChildren
            }
            NodeKind::BlockRef => block_ref(r, node, entering),
            NodeKind::BlockQueryEmbed => {
                if entering {
                    let script = r.child_tokens(node, NodeKind::BlockQueryEmbedScript);
                    let mut attrs = Attrs::new();
                    push_attr(&mut attrs, "data-content", escape_html(&strip_caret(&script)));
                    block_attrs(r, &mut attrs, node, "render-node");
                    r.tag("div", &attrs, false);
                    close_block(r, node);
                }
                Walk::SkipChildren
            }
            NodeKind::SuperBlock => {
                if entering {
                    let layout = r.child_tokens(node, NodeKind::SuperBlockLayoutMarker);
                    let layout = if layout.is_empty() { "row".to_owned() } else { layout };
                    let mut attrs = Attrs::new();
                    block_attrs(r, &mut attrs, node, "sb");
                    push_attr(&mut attrs, "data-sb-layout", layout);
                    r.tag("div", &attrs, false);
                } else {
                    close_block(r, node);
                }
                Walk::Continue
            }
            NodeKind::GitConflictContent => {
                if entering {
                    let tokens = r.tokens(node);
                    editable_block(r, node, true, Attrs::new(), "git-conflict");
                    r.write_escaped(tokens.trim());
                } else {
                    editable_block(r, node, false, Attrs::new(), "git-conflict");
                }
                Walk::Continue
            }
            NodeKind::Iframe | NodeKind::Video | NodeKind::Audio | NodeKind::Widget => {
                if entering {
                    let mut attrs = Attrs::new();
                    block_attrs(r, &mut attrs, node, "iframe");
                    r.tag("div", &attrs, false);
                    r.tag("div", &[("class", "iframe-content")], false);
                    let tokens = strip_caret(&r.tokens(node));
                    r.open_fragment();
                    r.write(&tokens);
                    r.close_fragment();
                    r.close_tag("div");
                    close_block(r, node);
                }
                Walk::SkipChildren
            }
        }
    }
}

fn inline_tag(r: &mut Block<'_>, entering: bool, name: &str) -> Walk {
    if entering {
        r.tag::<&str, &str>(name, &[], false);
    }
    Walk::Continue
}

/// Next `data-node-index` when `node` sits directly under the document.
fn node_index(r: &mut Block<'_>, node: NodeId) -> Option<i64> {
    let top_level = r
        .tree
        .parent(node)
        .is_some_and(|p| r.kind(p) == NodeKind::Document);
    if !top_level {
        return None;
    }
    let index = r.state.next_index.unwrap_or(r.options.node_index_start);
    r.state.next_index = Some(index + 1);
    Some(index)
}

fn block_attrs(r: &mut Block<'_>, attrs: &mut Attrs, node: NodeId, class: &str) {
    let index = node_index(r, node);
    r.block_attrs(attrs, node, class, index, IdPair::Omit);
}

fn close_block(r: &mut Block<'_>, node: NodeId) {
    r.render_panel(node);
    r.close_tag("div");
}

fn simple_block(r: &mut Block<'_>, node: NodeId, entering: bool, mut attrs: Attrs, class: &str) -> Walk {
    if entering {
        block_attrs(r, &mut attrs, node, class);
        r.tag("div", &attrs, false);
    } else {
        close_block(r, node);
    }
    Walk::Continue
}

/// Outer block div plus an editable inner div.
fn editable_block(r: &mut Block<'_>, node: NodeId, entering: bool, mut attrs: Attrs, class: &str) {
    if entering {
        block_attrs(r, &mut attrs, node, class);
        r.tag("div", &attrs, false);
        r.tag("div", &[("contenteditable", "true"), ("spellcheck", "false")], false);
    } else {
        r.close_tag("div");
        close_block(r, node);
    }
}

fn list_subtype(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Unordered => "u",
        ListKind::Ordered => "o",
        ListKind::Task => "t",
    }
}

fn list_item(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        close_block(r, node);
        return Walk::Continue;
    }
    let data = r.tree.node(node).list.clone();
    let marker = match data.kind {
        ListKind::Ordered => format!("{}.", data.num),
        ListKind::Unordered | ListKind::Task => "*".to_owned(),
    };
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-marker", marker.as_str());
    push_attr(&mut attrs, "data-subtype", list_subtype(data.kind));
    block_attrs(r, &mut attrs, node, "li");
    r.tag("div", &attrs, false);
    match data.kind {
        ListKind::Unordered => {
            r.tag("div", &[("class", "protyle-bullet")], false);
            r.close_tag("div");
        }
        ListKind::Ordered => {
            r.tag("div", &[("class", "protyle-bullet protyle-bullet--order")], false);
            r.write(&marker);
            r.close_tag("div");
        }
        ListKind::Task => {}
    }
    Walk::Continue
}

fn code_block_code(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let code = r.tokens(node);
    let mut caret_in_info = false;
    let mut language = String::new();
    let info = r
        .tree
        .parent(node)
        .and_then(|block| r.tree.child_by_kind(block, NodeKind::CodeBlockFenceInfoMarker));
    if let Some(info) = info {
        let info = r.tree.node_mut(info);
        caret_in_info = info.code_block_info.contains(CARET);
        info.code_block_info = strip_caret(&info.code_block_info);
        language = info_language(&info.code_block_info);
    }
    r.tag("div", &[("class", "protyle-code")], false);
    r.tag("div", &[("class", "protyle-code__language")], false);
    r.write_escaped(&language);
    r.close_tag("div");
    r.tag("div", &[("class", "protyle-code__copy")], false);
    r.close_tag("div");
    r.close_tag("div");
    r.tag("div", &[("contenteditable", "true"), ("spellcheck", "false")], false);
    if is_empty_content(&code) {
        if caret_in_info {
            r.write(FRONT_END_CARET);
        }
    } else {
        r.write_escaped(&code);
    }
    r.close_tag("div");
    Walk::Continue
}

fn math_block(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let math = r.child_tokens(node, NodeKind::MathBlockContent);
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, "language-math");
        push_attr(&mut attrs, "data-content", strip_caret(&escape_html(&math)));
        r.tag("div", &attrs, false);
    } else {
        close_block(r, node);
    }
    Walk::SkipChildren
}

fn table(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    let Some(head) = r.tree.first_child(node) else {
        return Walk::SkipChildren;
    };
    if entering {
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, "table");
        r.tag("div", &attrs, false);
        r.tag("div", &[("contenteditable", "true"), ("spellcheck", "false")], false);
        r.open_tag("table");
    } else {
        if r.tree.next(head).is_some() {
            r.close_tag("tbody");
        }
        r.close_tag("table");
        r.close_tag("div");
        close_block(r, node);
    }
    Walk::Continue
}

fn table_cell(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    let name = if r.is_header_cell(node) { "th" } else { "td" };
    if entering {
        let mut attrs = Attrs::new();
        if let Some(align) = r.tree.node(node).table_cell_align.as_attr() {
            push_attr(&mut attrs, "align", align);
        }
        r.tag(name, &attrs, false);
        r.prepare_table_cell(node);
    } else {
        r.close_tag(name);
    }
    Walk::Continue
}

/// Links are spans; the editor turns `data-href` into a hyperlink on demand.
fn link(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        r.close_tag("span");
        return Walk::Continue;
    }
    let mut dest = r.link_dest(node);
    if r.options.sanitize && is_script_url(&dest) {
        dest.clear();
    }
    let mut href = r.resolve_link(&dest);
    if href.contains(CARET) {
        if let Some(text) = r.tree.child_by_kind(node, NodeKind::LinkText) {
            r.tree.node_mut(text).tokens.push_str(CARET);
        }
        href = strip_caret(&href);
    }
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-type", "a");
    push_attr(&mut attrs, "data-href", escape_html(&href));
    if let Some(title) = r.tree.child_by_kind(node, NodeKind::LinkTitle) {
        push_attr(&mut attrs, "data-title", escape_ref_text(r.tree.tokens(title)));
    }
    r.tag("span", &attrs, false);
    Walk::Continue
}

fn image(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    let reference = r.tree.node(node).link_type == LinkType::Reference;
    if entering && !reference {
        r.disable_tags();
        return Walk::Continue;
    }
    if !entering {
        if reference {
            return Walk::Continue;
        }
        r.enable_tags();
        if r.tags_disabled() {
            return Walk::Continue;
        }
    }

    let mut dest = r.link_dest(node);
    if r.options.sanitize && is_script_url(&dest) {
        dest.clear();
    }
    let label = r.tree.node(node).link_ref_label.clone();
    let title = if reference {
        r.find_link_ref_link(&label)
            .map(|link| r.child_tokens(link, NodeKind::LinkTitle))
            .unwrap_or_default()
    } else {
        r.child_tokens(node, NodeKind::LinkTitle)
    };
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "src", escape_html(&strip_caret(&r.resolve_link(&dest))));
    push_attr(&mut attrs, "alt", escape_html(&strip_caret(&r.child_tokens(node, NodeKind::LinkText))));
    if !title.is_empty() {
        push_attr(&mut attrs, "title", escape_html(&strip_caret(&title)));
    }
    if reference {
        push_attr(&mut attrs, "data-type", "link-ref");
        push_attr(&mut attrs, "data-link-label", escape_html(&label));
    }
    r.open_fragment();
    r.tag("img", &attrs, true);
    r.close_fragment();
    if reference {
        Walk::SkipChildren
    } else {
        Walk::Continue
    }
}

fn inline_html(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    let raw = (tokens == "<br />" && r.tree.parent_is(node, NodeKind::TableCell))
        || tokens == "<u>"
        || tokens == "</u>";
    if raw {
        r.write(&tokens);
        return Walk::Continue;
    }
    r.tag("code", &[("data-type", "html-inline")], false);
    r.write_escaped(&tokens);
    r.write("</code>");
    Walk::Continue
}

fn html_entity(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let entity = r.tree.node(node).html_entity_tokens.clone();
    r.write(r#"<span class="protyle-wysiwyg__block" data-type="html-entity">"#);
    r.tag("code", &[("data-type", "html-entity"), ("style", "display: none")], false);
    r.write_escaped(&entity);
    r.write("</code>");
    r.tag("span", &[("class", "protyle-wysiwyg__preview"), ("data-render", "2")], false);
    r.open_tag("code");
    r.write(&strip_caret(&entity));
    r.write("</code></span></span>");
    Walk::Continue
}

fn footnotes_ref(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let (index, def) = r.footnote_index(r.tree.tokens(node));
    let tooltip = r.footnote_tooltip(def);
    let label = escape_html(&r.tree.node(node).footnotes_ref_label);
    r.tag(
        "sup",
        &[
            ("data-type", "footnotes-ref"),
            ("data-footnotes-label", label.as_str()),
            ("class", "protyle-tooltipped protyle-tooltipped__s"),
            ("aria-label", tooltip.as_str()),
        ],
        false,
    );
    r.write(&index.to_string());
    r.close_tag("sup");
    Walk::Continue
}

fn block_ref(r: &mut Block<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let (text_node, subtype) = match r.tree.child_by_kind(node, NodeKind::BlockRefText) {
        Some(t) => (Some(t), "s"),
        None => (r.tree.child_by_kind(node, NodeKind::BlockRefDynamicText), "d"),
    };
    let text = text_node.map(|t| r.tree.text(t)).unwrap_or_default();
    let id = escape_html(&r.child_tokens(node, NodeKind::BlockRefId));
    r.tag(
        "span",
        &[("data-type", "block-ref"), ("data-subtype", subtype), ("data-id", id.as_str())],
        false,
    );
    r.write(&escape_ref_text(&text));
    r.close_tag("span");
    if r.tree.next(node).is_none() {
        r.write(ZWSP);
    }
    Walk::SkipChildren
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RenderOptions;
    use caret_ast::{FixedIdGenerator, Tree, parse_markdown};
    use pretty_assertions::assert_eq;

    const ID: &str = FixedIdGenerator::TEST_ID;

    fn render_with(tree: &mut Tree, options: RenderOptions) -> String {
        Renderer::<BlockBackend>::new(tree, options)
            .unwrap()
            .with_id_generator(FixedIdGenerator::default())
            .render()
    }

    fn render(markdown: &str) -> String {
        render_with(&mut parse_markdown(markdown), RenderOptions::default())
    }

    const PANEL: &str = r#"<div class="protyle-attr" contenteditable="false"></div>"#;

    #[test]
    fn test_paragraph() {
        assert_eq!(
            render("hi"),
            format!(
                r#"<div data-node-id="{ID}" data-node-index="1" data-type="NodeParagraph" class="p"><div contenteditable="true" spellcheck="false">hi</div>{PANEL}</div>"#
            )
        );
    }

    #[test]
    fn test_node_index_counts_top_level_blocks_only() {
        let html = render("a\n\n> b\n\nc");
        assert!(html.contains(r#"data-node-index="1" data-type="NodeParagraph""#));
        assert!(html.contains(r#"data-node-index="2" data-type="NodeBlockquote""#));
        assert!(html.contains(r#"data-node-index="3" data-type="NodeParagraph""#));
        assert_eq!(html.matches("data-node-index").count(), 3);
    }

    #[test]
    fn test_node_index_start() {
        let options = RenderOptions {
            node_index_start: 7,
            ..RenderOptions::default()
        };
        let html = render_with(&mut parse_markdown("a\n\nb"), options);
        assert!(html.contains(r#"data-node-index="7""#));
        assert!(html.contains(r#"data-node-index="8""#));
    }

    #[test]
    fn test_ial_id_not_repeated() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        tree.append(p, NodeKind::Text, "x");
        tree.node_mut(p).set_ial_attr("id", "own");
        tree.node_mut(p).set_ial_attr("name", "N");
        let html = render_with(&mut tree, RenderOptions::default());
        assert!(html.starts_with(
            r#"<div data-node-id="own" data-node-index="1" data-type="NodeParagraph" class="p" name="N">"#
        ));
        assert!(html.contains("protyle-attr--name"));
    }

    #[test]
    fn test_ordered_list_bullets() {
        let html = render("2. a\n3. b");
        assert!(html.contains(&format!(
            r#"<div data-subtype="o" data-node-id="{ID}" data-node-index="1" data-type="NodeList" class="list">"#
        )));
        assert!(html.contains(&format!(
            r#"<div data-marker="2." data-subtype="o" data-node-id="{ID}" data-type="NodeListItem" class="li">"#
        )));
        assert!(html.contains(r#"<div class="protyle-bullet protyle-bullet--order">3.</div>"#));
    }

    #[test]
    fn test_task_item_checkbox() {
        let html = render("- [x] done");
        assert!(html.contains(r#"data-marker="*" data-subtype="t""#));
        assert!(html.contains(r#"<input checked="" type="checkbox" />"#));
        assert!(!html.contains("protyle-bullet"));
    }

    #[test]
    fn test_code_block_language() {
        let html = render("```go\nx < y\n```");
        assert!(html.contains(r#"class="code-block">"#));
        assert!(html.contains(r#"<div class="protyle-code__language">go</div>"#));
        assert!(html.contains(r#"<div contenteditable="true" spellcheck="false">x &lt; y</div>"#));
    }

    #[test]
    fn test_math_block_content() {
        let html = render("$$\na < b\n$$");
        assert!(html.contains(r#"class="language-math" data-content="a &lt; b""#));
    }

    #[test]
    fn test_link_is_span() {
        let html = render(r#"[x](/p "T")"#);
        assert!(html.contains(r#"<span data-type="a" data-href="/p" data-title="T">x</span>"#));
    }

    #[test]
    fn test_image_sanitized() {
        let options = RenderOptions {
            sanitize: true,
            ..RenderOptions::default()
        };
        let html = render_with(&mut parse_markdown("![a](javascript:alert(1))"), options);
        assert!(html.contains(r#"<img src="" alt="a" />"#));
    }

    #[test]
    fn test_html_block_kept_as_source() {
        let html = render("<div>\n<script>x()</script>\n</div>");
        assert!(html.contains(r#"class="html">"#));
        assert!(html.contains("<pre><code>&lt;div&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_footnote_ref() {
        let html = render("a[^1]\n\n[^1]: note");
        assert!(html.contains(r#"class="protyle-tooltipped protyle-tooltipped__s" aria-label="note">1</sup>"#));
        assert!(html.contains(r#"<li data-type="footnotes-li" data-marker="^1">"#));
    }

    #[test]
    fn test_caret_in_footnote_def_written_once() {
        let html = render("a[^1]\n\n[^1]: no‸te\n");
        assert_eq!(html.matches(CARET).count(), 1);
        assert!(html.contains(r#"aria-label="note""#));
    }
}
