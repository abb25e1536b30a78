//! WYSIWYG editor DOM.
//!
//! Inline markup keeps its source delimiter in `data-marker`, blocks carry
//! `data-block="0"`, and code, math and raw HTML render as an editable source element
//! followed by a `data-render="2"` preview.

use caret_ast::{LinkType, ListData, ListKind, NodeId, NodeKind, Tree};

use crate::code::{info_language, is_no_highlight_language};
use crate::cursor::{CARET, FRONT_END_CARET, ZWSP, is_empty_content, strip_caret, strip_spacers};
use crate::escape::escape_html;
use crate::ial::{Attrs, push_attr};
use crate::renderer::{RenderBackend, Renderer, Walk};
use crate::sanitize::is_script_url;

/// Prefix of heading ids in the WYSIWYG DOM.
const HEADING_ID_PREFIX: &str = "wysiwyg-";

pub(crate) const ANCHOR_SVG: &str = r#"<svg viewBox="0 0 16 16" version="1.1" width="16" height="16"><path fill-rule="evenodd" d="M4 9h1v1H4c-1.5 0-3-1.69-3-3.5S2.55 3 4 3h4c1.45 0 3 1.69 3 3.5 0 1.41-.91 2.72-2 3.25V8.59c.58-.45 1-1.27 1-2.09C10 5.22 8.98 4 8 4H4c-.98 0-2 1.22-2 2.5S3 9 4 9zm9-3h-1v1h1c1 0 2 1.22 2 2.5S13.98 12 13 12H9c-.98 0-2-1.22-2-2.5 0-.83.42-1.64 1-2.09V6.25c-1.09.53-2 1.84-2 3.25C6 11.31 7.55 13 9 13h4c1.45 0 3-1.69 3-3.5S14.5 6 13 6z"></path></svg>"#;

/// WYSIWYG backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct WysiwygBackend;

type Wysiwyg<'t> = Renderer<'t, WysiwygBackend>;

impl RenderBackend for WysiwygBackend {
    const NAME: &'static str = "wysiwyg";
    type State = ();

    fn render_node(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
        match r.kind(node) {
            NodeKind::Document
            | NodeKind::HeadingC8hMarker
            | NodeKind::HeadingId
            | NodeKind::BlockquoteMarker
            | NodeKind::CodeBlockFenceOpenMarker
            | NodeKind::CodeBlockFenceInfoMarker
            | NodeKind::CodeBlockFenceCloseMarker
            | NodeKind::MathBlockOpenMarker
            | NodeKind::MathBlockCloseMarker
            | NodeKind::InlineMathOpenMarker
            | NodeKind::InlineMathCloseMarker
            | NodeKind::CodeSpanOpenMarker
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
            | NodeKind::GitConflictOpenMarker
            | NodeKind::GitConflictCloseMarker
            | NodeKind::Emoji
            | NodeKind::EmojiAlias
            | NodeKind::Sup
            | NodeKind::Sub
            | NodeKind::Underline
            | NodeKind::Kbd => Walk::Continue,
            NodeKind::Paragraph => paragraph(r, node, entering),
            NodeKind::Text => text(r, node, entering),
            NodeKind::Heading => heading(r, node, entering),
            NodeKind::ThematicBreak => {
                if entering {
                    r.tag("hr", &[("data-block", "0")], true);
                }
                Walk::Continue
            }
            NodeKind::Blockquote => {
                r.write(if entering {
                    r#"<blockquote data-block="0">"#
                } else {
                    "</blockquote>"
                });
                Walk::Continue
            }
            NodeKind::List => list(r, node, entering),
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
            NodeKind::Emphasis | NodeKind::Strong | NodeKind::Strikethrough | NodeKind::Tag => {
                if entering {
                    r.spacer_before(node);
                    r.text_auto_space_previous(node);
                } else {
                    r.text_auto_space_next(node);
                }
                Walk::Continue
            }
            NodeKind::Mark => {
                if entering {
                    r.spacer_before(node);
                } else {
                    r.write(ZWSP);
                }
                Walk::Continue
            }
            NodeKind::EmA6kOpenMarker => marker_tag(r, entering, "em", "*"),
            NodeKind::EmU8eOpenMarker => marker_tag(r, entering, "em", "_"),
            NodeKind::StrongA6kOpenMarker => marker_tag(r, entering, "strong", "**"),
            NodeKind::StrongU8eOpenMarker => marker_tag(r, entering, "strong", "__"),
            NodeKind::Strikethrough1OpenMarker => marker_tag(r, entering, "s", "~"),
            NodeKind::Strikethrough2OpenMarker => marker_tag(r, entering, "s", "~~"),
            NodeKind::Mark1OpenMarker => marker_tag(r, entering, "mark", "="),
            NodeKind::Mark2OpenMarker => marker_tag(r, entering, "mark", "=="),
            NodeKind::SupOpenMarker => marker_tag(r, entering, "sup", "^"),
            NodeKind::SubOpenMarker => marker_tag(r, entering, "sub", "~"),
            NodeKind::UnderlineOpenMarker => open(r, entering, "u"),
            NodeKind::KbdOpenMarker => open(r, entering, "kbd"),
            NodeKind::TagOpenMarker => {
                if entering {
                    r.tag("span", &[("data-type", "tag"), ("data-marker", "#")], false);
                }
                Walk::Continue
            }
            NodeKind::EmA6kCloseMarker | NodeKind::EmU8eCloseMarker => close(r, entering, "em"),
            NodeKind::StrongA6kCloseMarker | NodeKind::StrongU8eCloseMarker => {
                close(r, entering, "strong")
            }
            NodeKind::Strikethrough1CloseMarker | NodeKind::Strikethrough2CloseMarker => {
                close(r, entering, "s")
            }
            NodeKind::Mark1CloseMarker | NodeKind::Mark2CloseMarker => close(r, entering, "mark"),
            NodeKind::SupCloseMarker => close(r, entering, "sup"),
            NodeKind::SubCloseMarker => close(r, entering, "sub"),
            NodeKind::UnderlineCloseMarker => close(r, entering, "u"),
            NodeKind::KbdCloseMarker => close(r, entering, "kbd"),
            NodeKind::TagCloseMarker => close(r, entering, "span"),
            NodeKind::CodeSpan => code_span(r, node, entering),
            NodeKind::CodeSpanContent => {
                if entering {
                    let content = escape_html(&r.tokens(node).replace(ZWSP, ""));
                    r.write(ZWSP);
                    r.write(&content);
                }
                Walk::Continue
            }
            NodeKind::CodeSpanCloseMarker => {
                if entering {
                    r.write("</code>");
                    let in_link = r
                        .tree
                        .parent(node)
                        .and_then(|span| r.tree.parent(span))
                        .is_some_and(|p| r.kind(p) == NodeKind::Link);
                    if !in_link {
                        r.write(ZWSP);
                    }
                }
                Walk::Continue
            }
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
            NodeKind::CodeBlock => code_block(r, node, entering),
            NodeKind::CodeBlockCode => code_block_code(r, node, entering),
            NodeKind::MathBlock => {
                r.write(if entering {
                    r#"<div class="vditor-wysiwyg__block" data-type="math-block" data-block="0">"#
                } else {
                    "</div>"
                });
                Walk::Continue
            }
            NodeKind::MathBlockContent => math_block_content(r, node, entering),
            NodeKind::InlineMath => {
                if entering {
                    r.spacer_before(node);
                }
                Walk::Continue
            }
            NodeKind::InlineMathContent => inline_math_content(r, node, entering),
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
            NodeKind::TableRow => {
                if entering {
                    r.open_tag("tr");
                } else {
                    r.close_tag("tr");
                }
                Walk::Continue
            }
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
            NodeKind::HtmlBlock
            | NodeKind::Iframe
            | NodeKind::Video
            | NodeKind::Audio
            | NodeKind::Widget => html_block(r, node, entering),
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
            NodeKind::BackslashContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::EmojiImg | NodeKind::EmojiUnicode => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write(&tokens);
                }
                Walk::Continue
            }
            NodeKind::YamlFrontMatter => {
                r.write(if entering {
                    r#"<div class="vditor-wysiwyg__block" data-type="yaml-front-matter" data-block="0">"#
                } else {
                    "</div>"
                });
                Walk::Continue
            }
            NodeKind::YamlFrontMatterContent => {
                if entering {
                    let tokens = r.tokens(node);
                    source_pre(r, "yaml-front-matter", &tokens);
                }
                Walk::Continue
            }
            NodeKind::FootnotesDefBlock => footnotes_def_block(r, entering),
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
                    r.render_toc(HEADING_ID_PREFIX);
                }
                Walk::SkipChildren
            }
            NodeKind::BlockRef => block_ref(r, node, entering),
            NodeKind::BlockQueryEmbed => {
                if entering {
                    r.write(r#"<div class="vditor-wysiwyg__block" data-type="block-query-embed" data-block="0">"#);
                    let script = r.child_tokens(node, NodeKind::BlockQueryEmbedScript);
                    source_pre(r, "block-query-embed", &script);
                    r.write("</div>");
                }
                Walk::SkipChildren
            }
            NodeKind::SuperBlock => {
                if entering {
                    let layout = r.child_tokens(node, NodeKind::SuperBlockLayoutMarker);
                    let layout = if layout.is_empty() { "row".to_owned() } else { layout };
                    r.tag(
                        "div",
                        &[
                            ("data-block", "0"),
                            ("data-type", "super-block"),
                            ("data-sb-layout", layout.as_str()),
                        ],
                        false,
                    );
                } else {
                    r.close_tag("div");
                }
                Walk::Continue
            }
            NodeKind::GitConflict => {
                r.write(if entering {
                    r#"<div class="vditor-wysiwyg__block" data-type="git-conflict" data-block="0">"#
                } else {
                    "</div>"
                });
                Walk::Continue
            }
            NodeKind::GitConflictContent => {
                if entering {
                    let tokens = r.tokens(node);
                    source_pre(r, "git-conflict", tokens.trim());
                }
                Walk::Continue
            }
        }
    }
}

/// Opening tag carrying the source delimiter.
fn marker_tag(r: &mut Wysiwyg<'_>, entering: bool, name: &str, marker: &str) -> Walk {
    if entering {
        r.tag(name, &[("data-marker", marker)], false);
    }
    Walk::Continue
}

fn open(r: &mut Wysiwyg<'_>, entering: bool, name: &str) -> Walk {
    if entering {
        r.open_tag(name);
    }
    Walk::Continue
}

fn close(r: &mut Wysiwyg<'_>, entering: bool, name: &str) -> Walk {
    if entering {
        r.close_tag(name);
    }
    Walk::Continue
}

/// `<pre><code data-type=..>` holding escaped source, `<wbr>` when empty.
fn source_pre(r: &mut Wysiwyg<'_>, data_type: &str, tokens: &str) {
    r.open_tag("pre");
    r.tag("code", &[("data-type", data_type)], false);
    if is_empty_content(tokens) {
        r.write(FRONT_END_CARET);
        r.write_char('\n');
    } else {
        r.write_escaped(tokens);
    }
    r.write("</code></pre>");
}

fn paragraph(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    let in_tight_list = r
        .tree
        .parent(node)
        .and_then(|item| r.tree.parent(item))
        .is_some_and(|list| r.kind(list) == NodeKind::List && r.tree.node(list).list.tight);
    if in_tight_list {
        return Walk::Continue;
    }
    if entering {
        let mut attrs = Attrs::new();
        push_attr(&mut attrs, "data-block", "0");
        attrs.extend(r.tree.node(node).ial.iter().cloned());
        r.tag("p", &attrs, false);
    } else {
        r.close_tag("p");
    }
    Walk::Continue
}

fn text(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let tokens = r.tokens(node);
        let tokens = strip_spacers(tokens.trim_end_matches('\n'));
        let tokens = r.spaced(&tokens);
        r.write_escaped(&tokens);
    }
    Walk::Continue
}

fn heading(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    let level = r.tree.node(node).heading_level.clamp(1, 6);
    if !entering {
        r.close_tag(&format!("h{level}"));
        return Walk::Continue;
    }
    let explicit = r.child_tokens(node, NodeKind::HeadingId);
    let normalized = r.heading_id(node);
    let n = r.tree.node(node);
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-block", "0");
    if !explicit.is_empty() {
        push_attr(&mut attrs, "data-id", escape_html(&explicit));
    }
    let id = match n.ial_attr("id") {
        Some(id) => id.to_owned(),
        None => format!("{HEADING_ID_PREFIX}{normalized}"),
    };
    push_attr(&mut attrs, "id", id);
    let marker = match (n.heading_setext, n.heading_level) {
        (false, _) => "#",
        (true, 1) => "=",
        (true, _) => "-",
    };
    push_attr(&mut attrs, "data-marker", marker);
    r.tag(&format!("h{level}"), &attrs, false);
    if r.options.heading_anchor {
        r.tag(
            "a",
            &[
                ("id", format!("vditorAnchor-{normalized}")),
                ("class", "vditor-anchor".to_owned()),
                ("href", format!("#{normalized}")),
            ],
            false,
        );
        r.write(ANCHOR_SVG);
        r.close_tag("a");
    }
    Walk::Continue
}

/// `data-marker` of a list or list item. Lists take the marker of their first item.
pub(crate) fn list_marker(data: &ListData) -> String {
    match (data.kind, data.bullet_char) {
        (ListKind::Ordered, _) | (ListKind::Task, None) => {
            let num = if data.num == 0 { data.start } else { data.num };
            format!("{num}{}", data.delimiter.unwrap_or('.'))
        }
        (_, bullet) if data.marker.is_empty() => bullet.unwrap_or('*').to_string(),
        _ => data.marker.clone(),
    }
}

pub(crate) fn list_tag(data: &ListData) -> &'static str {
    match (data.kind, data.bullet_char) {
        (ListKind::Ordered, _) | (ListKind::Task, None) => "ol",
        _ => "ul",
    }
}

fn list(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    let name = list_tag(&r.tree.node(node).list);
    if !entering {
        r.close_tag(name);
        return Walk::Continue;
    }
    let data = r.tree.node(node).list.clone();
    let mut attrs = Attrs::new();
    if data.tight {
        push_attr(&mut attrs, "data-tight", "true");
    }
    if data.bullet_char.is_none() && data.start != 1 {
        push_attr(&mut attrs, "start", data.start.to_string());
    }
    push_attr(&mut attrs, "data-marker", list_marker(&r.tree.node(node).list));
    push_attr(&mut attrs, "data-block", "0");
    r.tag(name, &attrs, false);
    Walk::Continue
}

fn list_item(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        r.close_tag("li");
        return Walk::Continue;
    }
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-marker", list_marker(&r.tree.node(node).list));
    if r.tree.node(node).list.kind == ListKind::Task && has_task_marker(r.tree(), node) {
        push_attr(&mut attrs, "class", r.options.task_list_item_class.clone());
    }
    r.tag("li", &attrs, false);
    if r.tree.first_child(node).is_none() {
        r.write(ZWSP);
    }
    Walk::Continue
}

/// Whether the item starts with a task marker, directly or inside its first paragraph.
pub(crate) fn has_task_marker(tree: &Tree, item: NodeId) -> bool {
    let Some(first) = tree.first_child(item) else {
        return false;
    };
    tree.kind(first) == NodeKind::TaskListItemMarker
        || tree
            .first_child(first)
            .is_some_and(|c| tree.kind(c) == NodeKind::TaskListItemMarker)
}

fn code_span(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let previous = strip_caret(&r.tree.previous_node_text(node));
    match previous.chars().next_back() {
        None => r.write(ZWSP),
        Some(c) if c.is_alphanumeric() && r.options.auto_space => r.write_char(' '),
        Some(_) => {}
    }
    let marker = "`".repeat(r.tree.node(node).code_marker_len.max(1));
    r.tag("code", &[("data-marker", marker)], false);
    Walk::Continue
}

fn code_block(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        r.write("</div>");
        return Walk::Continue;
    }
    let marker = r
        .tree
        .first_child(node)
        .map(|c| r.tokens(c))
        .filter(|t| t.starts_with("```"))
        .unwrap_or_else(|| "```".to_owned());
    r.tag(
        "div",
        &[
            ("class", "vditor-wysiwyg__block"),
            ("data-type", "code-block"),
            ("data-block", "0"),
            ("data-marker", marker.as_str()),
        ],
        false,
    );
    Walk::Continue
}

fn code_block_code(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let code = r.tokens(node);
    let fenced = r.tree.parent(node).is_some_and(|p| r.tree.node(p).fenced);
    let mut caret_in_info = false;
    let mut language = String::new();
    if fenced
        && let Some(info) = r.tree.prev(node)
        && r.kind(info) == NodeKind::CodeBlockFenceInfoMarker
    {
        let info = r.tree.node_mut(info);
        caret_in_info = info.code_block_info.contains(CARET);
        info.code_block_info = strip_caret(&info.code_block_info);
        language = info_language(&info.code_block_info);
    }
    let mut code_attrs = Attrs::new();
    if !language.is_empty() {
        push_attr(&mut code_attrs, "class", format!("language-{}", escape_html(&language)));
    }

    let preview = r.options.code_block_preview;
    let mut pre_attrs = Attrs::new();
    push_attr(&mut pre_attrs, "class", "vditor-wysiwyg__pre");
    if preview && !code.contains(CARET) && !caret_in_info {
        push_attr(&mut pre_attrs, "style", "display: none");
    }
    r.tag("pre", &pre_attrs, false);
    r.tag("code", &code_attrs, false);
    if is_empty_content(&code) {
        r.write(FRONT_END_CARET);
        r.write_char('\n');
    } else {
        if caret_in_info {
            r.write(FRONT_END_CARET);
        }
        r.write_escaped(&code);
        r.newline();
    }
    r.write("</code></pre>");

    if preview {
        r.tag("pre", &[("class", "vditor-wysiwyg__preview"), ("data-render", "2")], false);
        let name = if is_no_highlight_language(&language) {
            "div"
        } else {
            "code"
        };
        r.tag(name, &code_attrs, false);
        r.write_escaped(&strip_caret(&code));
        r.close_tag(name);
        r.close_tag("pre");
    }
    Walk::Continue
}

fn math_block_content(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    let source = tokens.trim();
    let preview = r.options.math_block_preview;
    let mut pre_attrs = Attrs::new();
    if preview && !source.contains(CARET) {
        push_attr(&mut pre_attrs, "style", "display: none");
    }
    r.tag("pre", &pre_attrs, false);
    r.tag("code", &[("data-type", "math-block")], false);
    if is_empty_content(source) {
        r.write(FRONT_END_CARET);
        r.write_char('\n');
    } else {
        r.write_escaped(source);
    }
    r.write("</code></pre>");
    if preview {
        r.tag("pre", &[("class", "vditor-wysiwyg__preview"), ("data-render", "2")], false);
        r.tag("div", &[("data-type", "math-block"), ("class", "language-math")], false);
        r.write_escaped(&strip_caret(&tokens));
        r.write("</div></pre>");
    }
    Walk::Continue
}

fn inline_math_content(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node).replace(ZWSP, "");
    let mut code_attrs = Attrs::new();
    push_attr(&mut code_attrs, "data-type", "math-inline");
    if !tokens.contains(CARET) {
        push_attr(&mut code_attrs, "style", "display: none");
    }
    r.write(r#"<span class="vditor-wysiwyg__block" data-type="math-inline">"#);
    r.tag("code", &code_attrs, false);
    r.write(ZWSP);
    r.write_escaped(&tokens);
    r.write("</code>");

    let mut preview = strip_caret(&tokens);
    if r.tree.parent_is(node, NodeKind::TableCell) {
        preview = preview.replace("\\|", "|");
    }
    r.tag("span", &[("class", "vditor-wysiwyg__preview"), ("data-render", "2")], false);
    r.tag("span", &[("class", "language-math")], false);
    r.write_escaped(&preview);
    r.write("</span></span></span>");
    r.write(ZWSP);
    Walk::Continue
}

fn table(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    let Some(head) = r.tree.first_child(node) else {
        return Walk::SkipChildren;
    };
    if entering {
        r.tag("table", &[("data-block", "0")], false);
    } else {
        if r.tree.next(head).is_some() {
            r.close_tag("tbody");
        }
        r.close_tag("table");
    }
    Walk::Continue
}

fn table_cell(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
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

fn link(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if r.tree.node(node).link_type == LinkType::Reference {
        if entering {
            r.spacer_before(node);
            let text = r.child_tokens(node, NodeKind::LinkText);
            let label = escape_html(&r.tree.node(node).link_ref_label);
            r.tag("span", &[("data-type", "link-ref"), ("data-link-label", label.as_str())], false);
            r.write_escaped(&text);
            r.close_tag("span");
            r.write(ZWSP);
            return Walk::SkipChildren;
        }
        return Walk::Continue;
    }
    if !entering {
        r.close_tag("a");
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
    push_attr(&mut attrs, "href", escape_html(&href));
    if let Some(title) = r.tree.child_by_kind(node, NodeKind::LinkTitle) {
        push_attr(&mut attrs, "title", escape_html(&strip_caret(r.tree.tokens(title))));
    }
    r.tag("a", &attrs, false);
    Walk::Continue
}

fn image(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if r.tree.node(node).link_type == LinkType::Reference {
        if entering {
            reference_image(r, node);
        }
        return Walk::SkipChildren;
    }
    if entering {
        r.disable_tags();
        return Walk::Continue;
    }
    r.enable_tags();
    if r.tags_disabled() {
        return Walk::Continue;
    }
    let mut dest = r.link_dest(node);
    if r.options.sanitize && is_script_url(&dest) {
        dest.clear();
    }
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "src", escape_html(&strip_caret(&r.resolve_link(&dest))));
    push_attr(&mut attrs, "alt", escape_html(&strip_caret(&r.child_tokens(node, NodeKind::LinkText))));
    if let Some(title) = r.tree.child_by_kind(node, NodeKind::LinkTitle) {
        push_attr(&mut attrs, "title", escape_html(&strip_caret(r.tree.tokens(title))));
    }
    r.open_fragment();
    r.tag("img", &attrs, true);
    r.close_fragment();
    Walk::Continue
}

/// `![text][label]`: an image pointing at the definition's destination and title.
fn reference_image(r: &mut Wysiwyg<'_>, node: NodeId) {
    r.spacer_before(node);
    let label = r.tree.node(node).link_ref_label.clone();
    let def_link = r.find_link_ref_link(&label);
    let dest = r.link_dest(node);
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "src", escape_html(&strip_caret(&r.resolve_link(&dest))));
    push_attr(&mut attrs, "alt", escape_html(&strip_caret(&r.child_tokens(node, NodeKind::LinkText))));
    if let Some(title) = def_link
        .map(|link| r.child_tokens(link, NodeKind::LinkTitle))
        .filter(|t| !t.is_empty())
    {
        push_attr(&mut attrs, "title", escape_html(&strip_caret(&title)));
    }
    push_attr(&mut attrs, "data-type", "link-ref");
    push_attr(&mut attrs, "data-link-label", escape_html(&label));
    r.open_fragment();
    r.tag("img", &attrs, true);
    r.close_fragment();
}

fn html_block(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    let tokens = tokens.trim();
    r.write(r#"<div class="vditor-wysiwyg__block" data-type="html-block" data-block="0">"#);
    r.write("<pre><code>");
    r.write_escaped(tokens);
    r.write("</code></pre>");
    r.tag("pre", &[("class", "vditor-wysiwyg__preview"), ("data-render", "2")], false);
    let preview = r.sanitized(&strip_caret(tokens));
    r.write(&preview);
    r.write("</pre></div>");
    Walk::SkipChildren
}

fn inline_html(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    if tokens == "<br />" && r.tree.parent_is(node, NodeKind::TableCell) {
        r.write(&tokens);
        return Walk::Continue;
    }
    let previous = strip_caret(&r.tree.previous_node_text(node));
    if previous.is_empty() || previous == ZWSP {
        r.write(ZWSP);
    }
    r.tag("code", &[("data-type", "html-inline")], false);
    r.write(ZWSP);
    r.write_escaped(&tokens.replace(ZWSP, ""));
    r.write("</code>");
    Walk::Continue
}

fn html_entity(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    r.spacer_before(node);
    let entity = r.tree.node(node).html_entity_tokens.clone();
    r.write(r#"<span class="vditor-wysiwyg__block" data-type="html-entity">"#);
    r.tag("code", &[("data-type", "html-entity"), ("style", "display: none")], false);
    r.write_escaped(&format!("{ZWSP}{entity}"));
    r.write("</code>");
    r.tag("span", &[("class", "vditor-wysiwyg__preview"), ("data-render", "2")], false);
    r.open_tag("code");
    r.write(&strip_caret(&entity));
    r.close_tag("code");
    r.close_tag("span");
    r.write("</span>");
    r.write(ZWSP);
    Walk::Continue
}

fn footnotes_def_block(r: &mut Wysiwyg<'_>, entering: bool) -> Walk {
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

fn footnotes_ref(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    r.spacer_before(node);
    let (index, def) = r.footnote_index(r.tree.tokens(node));
    let tooltip = r.footnote_tooltip(def);
    let label = escape_html(&r.tree.node(node).footnotes_ref_label);
    r.tag(
        "sup",
        &[
            ("data-type", "footnotes-ref"),
            ("data-footnotes-label", label.as_str()),
            ("class", "vditor-tooltipped vditor-tooltipped__s"),
            ("aria-label", tooltip.as_str()),
        ],
        false,
    );
    r.write(&index.to_string());
    r.close_tag("sup");
    r.write(ZWSP);
    Walk::Continue
}

fn block_ref(r: &mut Wysiwyg<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    r.spacer_before(node);
    let id = escape_html(&r.child_tokens(node, NodeKind::BlockRefId));
    let text = r
        .tree
        .child_by_kind(node, NodeKind::BlockRefText)
        .or_else(|| r.tree.child_by_kind(node, NodeKind::BlockRefDynamicText))
        .map(|t| r.tree.text(t))
        .unwrap_or_default();
    r.tag("span", &[("data-type", "block-ref"), ("data-id", id.as_str())], false);
    r.write_escaped(&text);
    r.close_tag("span");
    r.write(ZWSP);
    Walk::SkipChildren
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RenderOptions;
    use caret_ast::{FixedIdGenerator, parse_markdown};
    use pretty_assertions::assert_eq;

    fn render_with(tree: &mut Tree, options: RenderOptions) -> String {
        Renderer::<WysiwygBackend>::new(tree, options)
            .unwrap()
            .with_id_generator(FixedIdGenerator::default())
            .render()
    }

    fn render(markdown: &str) -> String {
        render_with(&mut parse_markdown(markdown), RenderOptions::default())
    }

    fn sanitizing() -> RenderOptions {
        RenderOptions {
            sanitize: true,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_paragraph_and_emphasis() {
        assert_eq!(
            render("Hello *world*"),
            r#"<p data-block="0">Hello <em data-marker="*">world</em></p>"#
        );
    }

    #[test]
    fn test_leading_emphasis_gets_one_spacer() {
        let html = render("**bold** tail");
        assert_eq!(html.matches(ZWSP).count(), 1);
        assert!(html.starts_with(&format!(r#"<p data-block="0">{ZWSP}<strong data-marker="**">"#)));
        assert!(!render("x **bold**").contains(ZWSP));
    }

    #[test]
    fn test_caret_between_letters() {
        assert_eq!(render("a‸b"), r#"<p data-block="0">a‸b</p>"#);
    }

    #[test]
    fn test_stale_spacers_stripped() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        tree.append(p, NodeKind::Text, "a\u{200b}b");
        let html = render_with(&mut tree, RenderOptions::default());
        assert_eq!(html, r#"<p data-block="0">ab</p>"#);
    }

    #[test]
    fn test_heading_ids_and_marker() {
        let html = render("# Hi there\n\n# Hi there");
        assert!(html.contains(r##"<h1 data-block="0" id="wysiwyg-Hi-there" data-marker="#">"##));
        assert!(html.contains(r#"id="wysiwyg-Hi-there-""#));
    }

    #[test]
    fn test_heading_anchor() {
        let mut tree = parse_markdown("## Go");
        let options = RenderOptions {
            heading_anchor: true,
            ..RenderOptions::default()
        };
        let html = render_with(&mut tree, options);
        assert!(html.contains(r##"<a id="vditorAnchor-Go" class="vditor-anchor" href="#Go">"##));
    }

    #[test]
    fn test_tight_list_skips_paragraphs() {
        let html = render("- a\n- b");
        assert_eq!(
            html,
            r#"<ul data-tight="true" data-marker="-" data-block="0"><li data-marker="-">a</li><li data-marker="-">b</li></ul>"#
        );
    }

    #[test]
    fn test_ordered_list_start() {
        let html = render("3. a\n4. b");
        assert!(html.starts_with(r#"<ol data-tight="true" start="3" data-marker="3." data-block="0">"#));
        assert!(html.contains(r#"<li data-marker="4.">"#));
    }

    #[test]
    fn test_task_item_class() {
        let html = render("- [x] done");
        assert!(html.contains(r#"class="vditor-task""#));
        assert!(html.contains(r#"<input checked="" type="checkbox" />"#));
    }

    #[test]
    fn test_code_span() {
        let html = render("`x`");
        assert_eq!(
            html,
            format!(r#"<p data-block="0">{ZWSP}<code data-marker="`">{ZWSP}x</code>{ZWSP}</p>"#)
        );
    }

    #[test]
    fn test_code_block_preview() {
        let html = render("```go\nfmt.Println(1 < 2)\n```");
        assert!(html.contains(r#"data-type="code-block" data-block="0" data-marker="```""#));
        assert!(html.contains(r#"<pre class="vditor-wysiwyg__pre" style="display: none"><code class="language-go">fmt.Println(1 &lt; 2)"#));
        assert!(html.contains(r#"<pre class="vditor-wysiwyg__preview" data-render="2"><code class="language-go">"#));
    }

    #[test]
    fn test_mermaid_preview_is_div() {
        let html = render("```mermaid\ngraph TD\n```");
        assert!(html.contains(r#"data-render="2"><div class="language-mermaid">graph TD"#));
    }

    #[test]
    fn test_empty_code_block_caret() {
        let html = render("```\n‸\n```");
        assert!(html.contains("<wbr>\n</code></pre>"));
        assert!(!html.contains(r#"style="display: none""#));
    }

    #[test]
    fn test_blank_code_block_is_empty() {
        let html = render("```\n   \n```");
        assert!(html.contains("<wbr>\n</code></pre>"));
    }

    #[test]
    fn test_html_block_sanitize_slash_separated_handler() {
        let markdown = "<div><svg/onload=alert(1)></div>";
        let clean = render_with(&mut parse_markdown(markdown), sanitizing());
        assert!(clean.contains("<div><svg></div>"));
        assert!(!clean.contains("<svg/onload"));
    }

    #[test]
    fn test_html_block_sanitize() {
        let markdown = "<div>x<script>evil()</script></div>";
        let raw = render(markdown);
        assert!(raw.contains(r#"data-render="2"><div>x<script>evil()</script></div></pre>"#));
        let clean = render_with(&mut parse_markdown(markdown), sanitizing());
        assert!(!clean.contains("<script>"));
        assert!(clean.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_link_script_cleared() {
        let clean = render_with(&mut parse_markdown("[x](javascript:alert(1))"), sanitizing());
        assert!(clean.contains(r#"<a href="">x</a>"#));
    }

    #[test]
    fn test_reference_link() {
        let html = render("[text][lbl]\n\n[lbl]: /u");
        assert!(html.contains(r#"<span data-type="link-ref" data-link-label="lbl">text</span>"#));
        assert!(html.contains("[lbl]: /u\n"));
    }

    #[test]
    fn test_image_fragment() {
        let html = render(r#"![a‸lt](p.png "T")"#);
        assert!(html.contains(r#"<img src="p.png" alt="alt" title="T" />"#));
        assert_eq!(html.matches("<img").count(), 1);
    }

    #[test]
    fn test_footnotes() {
        let html = render("a[^n] b[^n]\n\n[^n]: the note");
        assert!(html.contains(
            r#"<sup data-type="footnotes-ref" data-footnotes-label="^n" class="vditor-tooltipped vditor-tooltipped__s" aria-label="the note">1</sup>"#
        ));
        assert_eq!(html.matches(r#"data-type="footnotes-li""#).count(), 1);
    }

    #[test]
    fn test_empty_table_cell() {
        let html = render("| a | |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<th>a</th><th> </th>"));
        assert!(html.contains("</thead><tbody><tr><td>1</td>"));
        assert!(html.ends_with("</tbody></table>"));
    }

    #[test]
    fn test_inline_math() {
        let html = render("$x$");
        assert!(html.contains(r#"<code data-type="math-inline" style="display: none">"#));
        assert!(html.contains(r#"<span class="language-math">x</span></span></span>"#));
    }

    #[test]
    fn test_caret_in_footnote_def_written_once() {
        let html = render("a[^1]\n\n[^1]: no‸te\n");
        assert_eq!(html.matches(CARET).count(), 1);
        assert!(html.contains(r#"aria-label="note""#));
    }
}
