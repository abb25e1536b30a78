//! Static export rendering.
//!
//! Produces the block DOM of the exported document: every block is a `div` carrying its
//! merged attributes and followed by its attribute panel, inline markup uses plain HTML
//! elements, and embeds are sanitized fragments.

use std::sync::LazyLock;

use caret_ast::{ListKind, NodeId, NodeKind};
use regex::Regex;

use crate::code::{info_language, is_no_highlight_language};
use crate::cursor::{CARET, FRONT_END_CARET, ZWSP, is_empty_content, strip_caret};
use crate::escape::{escape_html, escape_ref_text};
use crate::ial::{Attrs, IdPair, push_attr};
use crate::renderer::{RenderBackend, Renderer, Walk};
use crate::sanitize::is_script_url;

static SRC_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\ssrc="([^"]*)""#).unwrap());

/// Export backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportBackend;

type Export<'t> = Renderer<'t, ExportBackend>;

impl RenderBackend for ExportBackend {
    const NAME: &'static str = "export";
    type State = ();

    fn render_node(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
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
            | NodeKind::InlineMathContent
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
            | NodeKind::Underline
            | NodeKind::Kbd => Walk::Continue,
            NodeKind::Paragraph => paragraph(r, node, entering),
            NodeKind::Heading => heading(r, node, entering),
            NodeKind::ThematicBreak => thematic_break(r, node, entering),
            NodeKind::Blockquote => simple_block(r, node, entering, "bq"),
            NodeKind::List => list(r, node, entering),
            NodeKind::ListItem => list_item(r, node, entering),
            NodeKind::TaskListItemMarker => task_marker(r, node, entering),
            NodeKind::HtmlBlock => html_block(r, node, entering),
            NodeKind::InlineHtml => inline_html(r, node, entering),
            NodeKind::HtmlEntity => html_entity(r, node, entering),
            NodeKind::CodeBlock => code_block(r, node, entering),
            NodeKind::CodeBlockCode => code_block_code(r, node, entering),
            NodeKind::Text => text(r, node, entering),
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
                    let content = r
                        .tree
                        .parent(node)
                        .map(|p| escape_html(&strip_caret(&r.tree.text(p))))
                        .unwrap_or_default();
                    r.tag("span", &[("data-type", "tag"), ("data-content", &content)], false);
                }
                Walk::Continue
            }
            NodeKind::TagCloseMarker => inline_tag(r, entering, "/span"),
            NodeKind::CodeSpan | NodeKind::InlineMath => {
                word_auto_space(r, node, entering);
                Walk::Continue
            }
            NodeKind::CodeSpanOpenMarker => inline_tag(r, entering, "code"),
            NodeKind::CodeSpanContent | NodeKind::BackslashContent | NodeKind::EmojiUnicode => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::CodeSpanCloseMarker => {
                if entering {
                    r.write("</code>");
                }
                Walk::Continue
            }
            NodeKind::InlineMathOpenMarker => {
                if entering {
                    let content = r.tree.next(node).map(|c| r.tokens(c)).unwrap_or_default();
                    let content = strip_caret(&escape_html(&content));
                    r.tag(
                        "span",
                        &[
                            ("data-type", "inline-math"),
                            ("data-subtype", "math"),
                            ("data-content", content.as_str()),
                            ("contenteditable", "false"),
                            ("class", "render-node"),
                        ],
                        false,
                    );
                }
                Walk::Continue
            }
            NodeKind::InlineMathCloseMarker => {
                if entering {
                    r.close_tag("span");
                    let caret_in_content =
                        r.tree.prev(node).is_some_and(|c| r.tree.tokens(c).contains(CARET));
                    if caret_in_content {
                        r.write(CARET);
                    }
                }
                Walk::Continue
            }
            NodeKind::MathBlock => math_block(r, node, entering),
            NodeKind::HardBreak | NodeKind::Br => {
                if entering {
                    r.write("<br />");
                }
                Walk::Continue
            }
            NodeKind::SoftBreak => soft_break(r, node, entering),
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
            NodeKind::Table => table(r, node, entering),
            NodeKind::TableHead => table_head(r, node, entering),
            NodeKind::TableRow => inline_tag(r, true, if entering { "tr" } else { "/tr" }),
            NodeKind::TableCell => table_cell(r, node, entering),
            NodeKind::EmojiImg => {
                if entering {
                    let tokens = r.tokens(node);
                    let tokens = replace_src(r, &tokens, false);
                    r.write(&tokens);
                }
                Walk::Continue
            }
            NodeKind::Backslash => {
                r.write(if entering {
                    r#"<span data-type="backslash">"#
                } else {
                    "</span>"
                });
                Walk::Continue
            }
            NodeKind::FootnotesDefBlock => footnotes_def_block(r, entering),
            NodeKind::FootnotesDef => footnotes_def(r, node, entering),
            NodeKind::FootnotesRef => footnotes_ref(r, node, entering),
            NodeKind::Toc => {
                if entering {
                    r.render_toc("");
                }
                Walk::SkipChildren
            }
            NodeKind::YamlFrontMatter => yaml_front_matter(r, node, entering),
            NodeKind::YamlFrontMatterContent => yaml_front_matter_content(r, node, entering),
            NodeKind::BlockRef => block_ref(r, node, entering),
            NodeKind::BlockQueryEmbed => block_query_embed(r, node, entering),
            NodeKind::SuperBlock => super_block(r, node, entering),
            NodeKind::GitConflictContent => git_conflict_content(r, node, entering),
            NodeKind::Iframe | NodeKind::Video | NodeKind::Audio | NodeKind::Widget => {
                embed(r, node, entering)
            }
        }
    }
}

fn inline_tag(r: &mut Export<'_>, entering: bool, name: &str) -> Walk {
    if entering {
        r.tag::<&str, &str>(name, &[], false);
    }
    Walk::Continue
}

fn block_attrs(r: &Export<'_>, attrs: &mut Attrs, node: NodeId, class: &str) {
    r.block_attrs(attrs, node, class, None, IdPair::Keep);
}

/// `contenteditable` from the IAL, or the configured default, then `spellcheck`.
fn editable_attrs(r: &Export<'_>, node: NodeId) -> Attrs {
    let mut attrs = Attrs::new();
    let value = match r.tree.node(node).ial_attr("contenteditable") {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => r.options.contenteditable_default.to_string(),
    };
    push_attr(&mut attrs, "contenteditable", value);
    push_attr(&mut attrs, "spellcheck", "false");
    attrs
}

fn close_block(r: &mut Export<'_>, node: NodeId) {
    r.render_panel(node);
    r.close_tag("div");
}

fn simple_block(r: &mut Export<'_>, node: NodeId, entering: bool, class: &str) -> Walk {
    if entering {
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, class);
        r.tag("div", &attrs, false);
    } else {
        close_block(r, node);
    }
    Walk::Continue
}

/// Outer block div plus an editable inner div.
fn editable_block(r: &mut Export<'_>, node: NodeId, entering: bool, mut attrs: Attrs, class: &str) {
    if entering {
        block_attrs(r, &mut attrs, node, class);
        r.tag("div", &attrs, false);
        let inner = editable_attrs(r, node);
        r.tag("div", &inner, false);
    } else {
        r.close_tag("div");
        close_block(r, node);
    }
}

fn paragraph(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    editable_block(r, node, entering, Attrs::new(), "p");
    Walk::Continue
}

fn heading(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    let level = r.tree.node(node).heading_level.clamp(1, 6);
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-subtype", format!("h{level}"));
    editable_block(r, node, entering, attrs, &format!("h{level}"));
    Walk::Continue
}

fn thematic_break(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
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

fn list_subtype(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Unordered => "u",
        ListKind::Ordered => "o",
        ListKind::Task => "t",
    }
}

fn list(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let mut attrs = Attrs::new();
        push_attr(&mut attrs, "data-subtype", list_subtype(r.tree.node(node).list.kind));
        block_attrs(r, &mut attrs, node, "list");
        r.tag("div", &attrs, false);
    } else {
        close_block(r, node);
    }
    Walk::Continue
}

fn list_item(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        close_block(r, node);
        return Walk::Continue;
    }
    let data = r.tree.node(node).list.clone();
    let mut class = "li".to_owned();
    let marker = match data.kind {
        ListKind::Ordered => format!("{}.", data.num),
        ListKind::Unordered | ListKind::Task => "*".to_owned(),
    };
    if data.kind == ListKind::Task
        && r.tree.first_child(node).is_some_and(|c| r.tree.node(c).task_checked)
    {
        class.push_str(" protyle-task--done");
    }
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-marker", marker);
    push_attr(&mut attrs, "data-subtype", list_subtype(data.kind));
    block_attrs(r, &mut attrs, node, &class);
    r.tag("div", &attrs, false);
    match data.kind {
        ListKind::Unordered => {
            r.tag("div", &[("class", "protyle-action"), ("draggable", "true")], false);
            r.write(r##"<svg><use xlink:href="#iconDot"></use></svg>"##);
            r.close_tag("div");
        }
        ListKind::Ordered => {
            r.tag(
                "div",
                &[
                    ("class", "protyle-action protyle-action--order"),
                    ("contenteditable", "false"),
                    ("draggable", "true"),
                ],
                false,
            );
            r.write(&format!("{}.", data.num));
            r.close_tag("div");
        }
        ListKind::Task => {}
    }
    Walk::Continue
}

fn task_marker(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let icon = if r.tree.node(node).task_checked {
            "iconCheck"
        } else {
            "iconUncheck"
        };
        r.write(&format!(
            r##"<div class="protyle-action protyle-action--task"><svg><use xlink:href="#{icon}"></use></svg></div>"##
        ));
        if r.tree.next(node).is_none() {
            let paragraph = r.tree.new_node(NodeKind::Paragraph);
            r.tree.insert_after(node, paragraph);
        }
    }
    Walk::Continue
}

fn html_block(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let mut attrs = Attrs::new();
    block_attrs(r, &mut attrs, node, "render-node");
    push_attr(&mut attrs, "data-subtype", "block");
    r.tag("div", &attrs, false);
    r.write("<div>");
    let content = escape_html(&r.sanitized(&strip_caret(&r.tokens(node))));
    r.tag("protyle-html", &[("data-content", content)], false);
    r.close_tag("protyle-html");
    r.write(&format!(r#"<span style="position: absolute">{ZWSP}</span>"#));
    r.write("</div>");
    close_block(r, node);
    Walk::Continue
}

fn inline_html(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let tokens = r.tokens(node);
        r.open_fragment();
        r.write(&tokens);
        r.close_fragment();
    }
    Walk::Continue
}

fn html_entity(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
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
    r.close_tag("code");
    r.close_tag("span");
    r.write("</span>");
    Walk::Continue
}

fn code_block_language(r: &Export<'_>, node: NodeId) -> String {
    r.tree
        .child_by_kind(node, NodeKind::CodeBlockFenceInfoMarker)
        .map(|info| info_language(&r.tree.node(info).code_block_info))
        .unwrap_or_default()
}

fn code_block(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    let language = code_block_language(r, node);
    if is_no_highlight_language(&language) {
        if entering {
            let code = r.child_tokens(node, NodeKind::CodeBlockCode);
            let content = strip_caret(&escape_html(&code)).trim().to_owned();
            let mut attrs = Attrs::new();
            block_attrs(r, &mut attrs, node, "render-node");
            push_attr(&mut attrs, "data-content", content);
            push_attr(&mut attrs, "data-subtype", language);
            r.tag("div", &attrs, false);
            r.tag("div", &[("spin", "1")], false);
            r.close_tag("div");
            close_block(r, node);
        }
        return Walk::SkipChildren;
    }
    simple_block(r, node, entering, "code-block")
}

/// Language label and copy button shared by code blocks and front matter.
fn code_action_bar(r: &mut Export<'_>, language: &str) {
    r.tag("div", &[("class", "protyle-action")], false);
    r.tag(
        "span",
        &[
            ("class", "protyle-action--first protyle-action__language"),
            ("contenteditable", "false"),
        ],
        false,
    );
    r.write(language);
    r.close_tag("span");
    r.write(r#"<span class="fn__flex-1"></span>"#);
    r.tag(
        "span",
        &[("class", "protyle-icon protyle-icon--only protyle-action__copy")],
        false,
    );
    r.write(r##"<svg><use xlink:href="#iconCopy"></use></svg>"##);
    r.close_tag("span");
    r.close_tag("div");
}

fn code_block_code(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let code = r.tokens(node);
    let mut caret_in_info = false;
    let mut language = String::new();
    if let Some(info) = r.tree.prev(node) {
        let info = r.tree.node_mut(info);
        caret_in_info = info.code_block_info.contains(CARET);
        info.code_block_info = strip_caret(&info.code_block_info);
        language = info_language(&info.code_block_info);
    }
    code_action_bar(r, &escape_html(&language));
    r.tag("div", &[("class", "hljs")], false);
    r.open_tag("div");
    r.close_tag("div");
    r.tag(
        "div",
        &[("contenteditable", "false"), ("style", "flex: 1"), ("spellcheck", "false")],
        false,
    );
    if is_empty_content(&code) {
        if caret_in_info {
            r.write(FRONT_END_CARET);
        }
    } else {
        r.write_escaped(&code);
    }
    r.close_tag("div");
    r.close_tag("div");
    Walk::Continue
}

fn text(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let tokens = r.tokens(node);
        let in_kbd = r.tree.parent(node).map(|p| r.kind(p)) == Some(NodeKind::Kbd);
        let tokens = if in_kbd { tokens } else { r.spaced(&tokens) };
        r.write_escaped(&tokens);
    }
    Walk::Continue
}

/// Space between a code span or inline math and a neighboring letter or digit.
fn word_auto_space(r: &mut Export<'_>, node: NodeId, entering: bool) {
    if !r.options.auto_space {
        return;
    }
    let wordy = if entering {
        r.tree.previous_node_text(node).chars().next_back()
    } else {
        r.tree.next_node_text(node).chars().next()
    }
    .is_some_and(char::is_alphanumeric);
    if wordy {
        r.write_char(' ');
    }
}

fn math_block(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering && r.tree.first_child(node).is_some() {
        let math = r.child_tokens(node, NodeKind::MathBlockContent);
        let content = strip_caret(&escape_html(&math)).trim().to_owned();
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, "render-node");
        push_attr(&mut attrs, "data-content", content);
        push_attr(&mut attrs, "data-subtype", "math");
        r.tag("div", &attrs, false);
        r.tag("div", &[("spin", "1")], false);
        r.close_tag("div");
        close_block(r, node);
    }
    Walk::SkipChildren
}

fn soft_break(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        r.write_char('\n');
        let after_span = r.tree.prev(node).is_some_and(|p| {
            matches!(
                r.kind(p),
                NodeKind::Strong
                    | NodeKind::Emphasis
                    | NodeKind::Tag
                    | NodeKind::Strikethrough
                    | NodeKind::Underline
                    | NodeKind::KramdownSpanIal
            )
        });
        let caret_next = r.tree.next(node).is_some_and(|n| r.tree.tokens(n) == CARET);
        if after_span && caret_next {
            r.write_char('\n');
        }
    }
    Walk::Continue
}

fn link(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
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
    push_attr(&mut attrs, "target", "_blank");
    push_attr(&mut attrs, "href", escape_html(&href));
    if let Some(title) = r.tree.child_by_kind(node, NodeKind::LinkTitle) {
        push_attr(&mut attrs, "data-title", escape_ref_text(r.tree.tokens(title)));
    }
    r.tag("a", &attrs, false);
    Walk::Continue
}

/// The `width` declaration of an inline style, if any.
fn style_width(style: &str) -> Option<&str> {
    style.split(';').find(|s| s.contains("width"))
}

fn image(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        image_open(r, node);
    } else {
        image_close(r, node);
    }
    Walk::Continue
}

fn image_open(r: &mut Export<'_>, node: NodeId) {
    let n = r.tree.node(node);
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "contenteditable", "false");
    push_attr(&mut attrs, "data-type", "img");
    push_attr(&mut attrs, "class", "img");
    if let Some(parent_style) = n.ial_attr("parent-style") {
        let parent_style = parent_style.replace("display: block;", "");
        let parent_style = parent_style.trim();
        if !parent_style.is_empty() {
            push_attr(&mut attrs, "style", parent_style);
        }
    }
    let mut width_attrs = Attrs::new();
    if let Some(width) = n.ial_attr("style").and_then(style_width) {
        let width = width.replace("vw", "%");
        let width = width.trim();
        if !width.is_empty() {
            push_attr(&mut width_attrs, "style", format!("{width};"));
        }
    }
    if r.last_byte() == Some(b'\n') {
        r.write(ZWSP);
    }
    r.tag("span", &attrs, false);
    r.open_tag("span");
    r.write(" ");
    r.close_tag("span");
    r.tag("span", &width_attrs, false);
    r.tag("span", &[("class", "protyle-action protyle-icons")], false);
    r.write(r##"<span class="protyle-icon protyle-icon--only"><svg class="svg"><use xlink:href="#iconMore"></use></svg></span>"##);
    r.close_tag("span");
}

fn image_close(r: &mut Export<'_>, node: NodeId) {
    let mut dest = r.link_dest(node);
    if r.options.sanitize && is_script_url(&dest) {
        dest.clear();
    }
    let data_src = strip_caret(&dest);
    let src = r.resolve_link(&data_src);
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "src", escape_html(&src));
    push_attr(&mut attrs, "data-src", escape_html(&data_src));
    let alt = r.child_tokens(node, NodeKind::LinkText);
    if !alt.is_empty() {
        push_attr(&mut attrs, "alt", escape_ref_text(&alt));
    }
    let title = r.child_tokens(node, NodeKind::LinkTitle);
    if !title.is_empty() {
        push_attr(&mut attrs, "title", escape_ref_text(&title));
    }
    if let Some(style) = r.tree.node(node).ial_attr("style") {
        let mut style = style.to_owned();
        if let Some(width) = style_width(&style).map(ToOwned::to_owned) {
            style = style.replace(&format!("{width};"), "");
        }
        let style = style
            .replace("flex: 0 0 auto;", "")
            .replace("display: block;", "");
        let style = style.trim();
        if !style.is_empty() {
            push_attr(&mut attrs, "style", style);
        }
    }
    r.open_fragment();
    r.tag("img", &attrs, true);
    r.close_fragment();

    r.tag("span", &[("class", "protyle-action__drag")], false);
    r.close_tag("span");
    if r.options.protyle_mark_network_images && !data_src.starts_with("assets/") {
        r.write(r##"<span class="img__net"><svg><use xlink:href="#iconLanguage"></use></svg></span>"##);
    }
    r.tag("span", &[("class", "protyle-action__title")], false);
    r.open_tag("span");
    r.write_escaped(&title);
    r.close_tag("span");
    r.close_tag("span");
    r.close_tag("span");
    r.open_tag("span");
    r.write(" ");
    r.close_tag("span");
    r.close_tag("span");
}

fn table(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if r.tree.first_child(node).is_none() {
        return Walk::SkipChildren;
    }
    if entering {
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, "table");
        r.tag("div", &attrs, false);
        r.tag("div", &[("contenteditable", "false")], false);
        let inner = editable_attrs(r, node);
        r.tag("table", &inner, false);
    } else {
        r.close_tag("tbody");
        r.close_tag("table");
        r.write(r#"<div class="protyle-action__table"><div class="table__resize"></div><div class="table__select"></div></div>"#);
        r.close_tag("div");
        close_block(r, node);
    }
    Walk::Continue
}

fn table_head(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        r.close_tag("thead");
        r.open_tag("tbody");
        return Walk::Continue;
    }
    let colgroup = r
        .tree
        .parent(node)
        .and_then(|t| r.tree.node(t).ial_attr("colgroup"))
        .filter(|c| !c.is_empty())
        .map(ToOwned::to_owned);
    let styles: Vec<String> = match colgroup {
        Some(colgroup) => colgroup.split('|').map(ToOwned::to_owned).collect(),
        None => {
            let row = r.tree.first_child(node);
            row.map(|row| {
                r.tree
                    .children(row)
                    .filter(|&c| r.kind(c) == NodeKind::TableCell)
                    .map(|c| r.tree.node(c).ial_attr("style").unwrap_or_default().to_owned())
                    .collect()
            })
            .unwrap_or_default()
        }
    };
    r.open_tag("colgroup");
    for style in styles {
        if style.is_empty() {
            r.tag::<&str, &str>("col", &[], true);
        } else {
            r.tag("col", &[("style", style)], true);
        }
    }
    r.close_tag("colgroup");
    r.open_tag("thead");
    Walk::Continue
}

fn table_cell(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    let name = if r.is_header_cell(node) { "th" } else { "td" };
    if entering {
        r.prepare_table_cell(node);
        let n = r.tree.node(node);
        let mut attrs = Attrs::new();
        if let Some(align) = n.table_cell_align.as_attr() {
            push_attr(&mut attrs, "align", align);
        }
        attrs.extend(n.ial.iter().cloned());
        r.tag(name, &attrs, false);
    } else {
        r.close_tag(name);
    }
    Walk::Continue
}

fn footnotes_def_block(r: &mut Export<'_>, entering: bool) -> Walk {
    if r.rendering_footnotes() {
        return Walk::SkipChildren;
    }
    if entering {
        r.write(r#"<div class="footnotes-defs-div">"#);
        r.write("<hr class=\"footnotes-defs-hr\" />\n");
        r.write(r#"<ol class="footnotes-defs-ol">"#);
        r.render_footnote_defs();
    } else {
        r.write("</ol></div>");
    }
    Walk::SkipChildren
}

fn footnotes_def(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        r.write("<li>");
        if let Some(first) = r.tree.first_child(node) {
            let anchor = format!(
                r#"<span id="footnotes-def-{}"></span>"#,
                r.tree.node(node).footnotes_ref_id
            );
            let anchor = r.tree.new_text_node(NodeKind::InlineHtml, anchor);
            r.tree.prepend_child(first, anchor);
        }
    } else {
        r.write("</li>\n");
    }
    Walk::Continue
}

fn footnotes_ref(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let (index, _) = r.footnote_index(r.tree.tokens(node));
        let ref_id = format!("footnotes-ref-{}", r.tree.node(node).footnotes_ref_id);
        let href = format!("{}#footnotes-def-{index}", r.options.link_base);
        r.tag("sup", &[("class", "footnotes-ref"), ("id", ref_id.as_str())], false);
        r.tag("a", &[("href", href)], false);
        r.write(&index.to_string());
        r.close_tag("a");
        r.close_tag("sup");
    }
    Walk::Continue
}

fn yaml_front_matter(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let mut attrs = Attrs::new();
        push_attr(&mut attrs, "linenumber", "false");
        push_attr(&mut attrs, "ligatures", "false");
        block_attrs(r, &mut attrs, node, "code-block");
        r.tag("div", &attrs, false);
    } else {
        close_block(r, node);
    }
    Walk::Continue
}

fn yaml_front_matter_content(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        code_action_bar(r, "yaml");
        let mut attrs = Attrs::new();
        push_attr(&mut attrs, "class", "hljs");
        attrs.extend(editable_attrs(r, node));
        r.tag("div", &attrs, false);
        let tokens = r.tokens(node);
        r.write_escaped(&tokens);
        r.close_tag("div");
    }
    Walk::Continue
}

fn block_ref(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
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
    Walk::SkipChildren
}

fn block_query_embed(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering && r.tree.child_by_kind(node, NodeKind::BlockQueryEmbedScript).is_some() {
        let script = r.child_tokens(node, NodeKind::BlockQueryEmbedScript);
        let mut attrs = Attrs::new();
        push_attr(&mut attrs, "data-content", escape_html(&strip_caret(&script)));
        block_attrs(r, &mut attrs, node, "render-node");
        r.tag("div", &attrs, false);
        close_block(r, node);
    }
    Walk::SkipChildren
}

fn super_block(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if r.tree.first_child(node).is_none() {
        return Walk::Continue;
    }
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

fn git_conflict_content(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, "git-conflict");
        r.tag("div", &attrs, false);
        r.tag("div", &[("contenteditable", "false"), ("spellcheck", "false")], false);
        let tokens = r.tokens(node);
        r.write_escaped(tokens.trim());
    } else {
        r.close_tag("div");
        close_block(r, node);
    }
    Walk::Continue
}

/// Point the `src` of embed markup at the resolved path and keep the original in
/// `data-src`.
fn replace_src(r: &Export<'_>, tokens: &str, add_data_src: bool) -> String {
    let Some(data_src) = SRC_ATTR_RE.captures(tokens).map(|c| c[1].to_owned()) else {
        return tokens.to_owned();
    };
    let src = r.resolve_link(&data_src);
    let mut replacement = format!(r#" src="{src}""#);
    if add_data_src && !tokens.contains("data-src=") {
        replacement.push_str(&format!(r#" data-src="{data_src}""#));
    }
    tokens.replace(&format!(r#" src="{data_src}""#), &replacement)
}

fn embed(r: &mut Export<'_>, node: NodeId, entering: bool) -> Walk {
    let kind = r.kind(node);
    if entering {
        let mut attrs = Attrs::new();
        block_attrs(r, &mut attrs, node, "iframe");
        if kind == NodeKind::Widget {
            push_attr(&mut attrs, "data-subtype", "widget");
        }
        r.tag("div", &attrs, false);
        r.tag("div", &[("class", "iframe-content")], false);
        let tokens = strip_caret(&r.tokens(node));
        let tokens = replace_src(r, &tokens, true);
        r.open_fragment();
        r.write(&tokens);
        r.close_fragment();
        if kind == NodeKind::Audio {
            r.write(ZWSP);
        }
    } else {
        if kind != NodeKind::Audio {
            r.tag(
                "span",
                &[("class", "protyle-action__drag"), ("contenteditable", "false")],
                false,
            );
            r.close_tag("span");
        }
        if kind == NodeKind::Video {
            r.write(ZWSP);
        }
        r.close_tag("div");
        close_block(r, node);
    }
    Walk::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RenderOptions;
    use caret_ast::{FixedIdGenerator, Tree, parse_markdown};
    use pretty_assertions::assert_eq;

    const ID: &str = FixedIdGenerator::TEST_ID;

    fn render_with(tree: &mut Tree, options: RenderOptions) -> String {
        Renderer::<ExportBackend>::new(tree, options)
            .unwrap()
            .with_id_generator(FixedIdGenerator::default())
            .render()
    }

    fn render(markdown: &str) -> String {
        render_with(&mut parse_markdown(markdown), RenderOptions::default())
    }

    fn panel() -> &'static str {
        r#"<div class="protyle-attr" contenteditable="false"></div>"#
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(
            render("a < b"),
            format!(
                r#"<div data-node-id="{ID}" data-type="NodeParagraph" class="p"><div contenteditable="true" spellcheck="false">a &lt; b</div>{}</div>"#,
                panel()
            )
        );
    }

    #[test]
    fn test_ial_id_is_kept() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append(root, NodeKind::Paragraph, "");
        tree.node_mut(p).set_ial_attr("id", "own");
        tree.node_mut(p).set_ial_attr("contenteditable", "false");
        tree.append(p, NodeKind::Text, "x");
        let html = render_with(&mut tree, RenderOptions::default());
        assert!(html.starts_with(
            r#"<div data-node-id="own" data-type="NodeParagraph" class="p" id="own" contenteditable="false"><div contenteditable="false" spellcheck="false">x</div>"#
        ));
    }

    #[test]
    fn test_heading_subtype_first() {
        let html = render("## Title");
        assert!(html.starts_with(&format!(
            r#"<div data-subtype="h2" data-node-id="{ID}" data-type="NodeHeading" class="h2">"#
        )));
    }

    #[test]
    fn test_emphasis_and_strong() {
        let html = render("*a* **b** ~~c~~");
        assert!(html.contains("<em>a</em> <strong>b</strong> <s>c</s>"));
    }

    #[test]
    fn test_caret_survives_once() {
        let html = render("a‸b");
        assert_eq!(html.matches(CARET).count(), 1);
        assert!(html.contains(">a‸b<"));
    }

    #[test]
    fn test_link_resolves_and_moves_caret() {
        let mut tree = parse_markdown("[t](a/b‸)");
        let options = RenderOptions {
            link_base: "/base".to_owned(),
            ..RenderOptions::default()
        };
        let html = render_with(&mut tree, options);
        assert!(html.contains(r#"<a target="_blank" href="/base/a/b">t‸</a>"#));
    }

    #[test]
    fn test_image_is_sanitized_fragment() {
        let mut tree = parse_markdown("![alt](javascript:alert(1))");
        let options = RenderOptions {
            sanitize: true,
            ..RenderOptions::default()
        };
        let html = render_with(&mut tree, options);
        assert!(!html.contains("javascript:"));
        assert!(html.contains(r#"<img src="" data-src="" alt="alt" />"#));
        assert!(html.contains(r#"<span class="img__net">"#));
    }

    #[test]
    fn test_asset_image_not_marked() {
        let html = render("![x](assets/a.png)");
        assert!(html.contains(r#"<img src="assets/a.png" data-src="assets/a.png" alt="x" />"#));
        assert!(!html.contains("img__net"));
    }

    #[test]
    fn test_heading_attribute_cannot_leave_its_quotes() {
        let options = RenderOptions {
            sanitize: true,
            ..RenderOptions::default()
        };
        let mut tree = parse_markdown("# T {data-x=a\"onmouseover=alert(1)}\n");
        let html = render_with(&mut tree, options);
        assert!(html.contains(r#"data-x="a&quot;onmouseover=alert(1)""#));
        assert!(!html.contains(r#""onmouseover"#));
    }

    #[test]
    fn test_list_items() {
        let html = render("1. one\n2. two");
        assert!(html.contains(r#"data-marker="2." data-subtype="o""#));
        assert!(html.contains(r#"<div class="protyle-action protyle-action--order" contenteditable="false" draggable="true">2.</div>"#));
    }

    #[test]
    fn test_task_marker_gets_paragraph() {
        let mut tree = Tree::new();
        let root = tree.root();
        let list = tree.append(root, NodeKind::List, "");
        tree.node_mut(list).list.kind = ListKind::Task;
        let item = tree.append(list, NodeKind::ListItem, "");
        tree.node_mut(item).list.kind = ListKind::Task;
        let marker = tree.append(item, NodeKind::TaskListItemMarker, "[x]");
        tree.node_mut(marker).task_checked = true;
        let html = render_with(&mut tree, RenderOptions::default());
        assert!(html.contains(r#"class="li protyle-task--done""#));
        assert!(html.contains("#iconCheck"));
        assert!(html.contains(r#"data-type="NodeParagraph""#));
        assert!(tree.next(marker).is_some());
    }

    #[test]
    fn test_footnotes() {
        let html = render("a[^1] b[^1]\n\n[^1]: note");
        assert!(html.contains(
            r##"<sup class="footnotes-ref" id="footnotes-ref-1:1"><a href="#footnotes-def-1">1</a></sup>"##
        ));
        assert!(html.contains(r#"id="footnotes-ref-1:2""#));
        assert!(html.contains("<hr class=\"footnotes-defs-hr\" />\n<ol class=\"footnotes-defs-ol\"><li>"));
        assert!(html.contains(r#"<span id="footnotes-def-1"></span>note"#));
        assert_eq!(html.matches("<li>").count(), 1);
    }

    #[test]
    fn test_empty_table_cell_is_space() {
        let html = render("| a | |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<th>a</th><th> </th>"));
        assert!(html.contains("<colgroup><col /><col /></colgroup><thead>"));
        assert!(html.contains("</tbody></table>"));
    }

    #[test]
    fn test_html_block_sanitized() {
        let markdown = "<div>x<script>evil()</script></div>";
        let raw = render(markdown);
        assert!(raw.contains("&lt;script&gt;evil()&lt;/script&gt;"));
        let mut tree = parse_markdown(markdown);
        let options = RenderOptions {
            sanitize: true,
            ..RenderOptions::default()
        };
        let clean = render_with(&mut tree, options);
        assert!(!clean.contains("script"));
        assert!(clean.contains(r#"data-content="&lt;div&gt;x&lt;/div&gt;""#));
    }

    #[test]
    fn test_no_highlight_code_block_is_render_node() {
        let html = render("```mermaid\ngraph TD\n```");
        assert!(html.contains(r#"class="render-node" data-content="graph TD" data-subtype="mermaid""#));
        assert!(!html.contains("protyle-action__language"));
    }

    #[test]
    fn test_code_block() {
        let html = render("```rust\nlet a = 1 < 2;\n```");
        assert!(html.contains(r#"class="protyle-action--first protyle-action__language" contenteditable="false">rust</span>"#));
        assert!(html.contains("let a = 1 &lt; 2;"));
    }

    #[test]
    fn test_code_span_auto_space() {
        let mut tree = parse_markdown("a`b`c");
        let options = RenderOptions {
            auto_space: true,
            ..RenderOptions::default()
        };
        let html = render_with(&mut tree, options);
        assert!(html.contains("a <code>b</code> c"));
    }

    #[test]
    fn test_iframe_src_resolved() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.append(root, NodeKind::Iframe, r#"<iframe src="v.html"></iframe>"#);
        let options = RenderOptions {
            link_base: "/b".to_owned(),
            ..RenderOptions::default()
        };
        let html = render_with(&mut tree, options);
        assert!(html.contains(r#"<iframe src="/b/v.html" data-src="v.html"></iframe>"#));
        assert!(html.contains(r#"<span class="protyle-action__drag" contenteditable="false"></span>"#));
    }
}
