//! Instant-rendering editor DOM.
//!
//! Every inline construct is a `vditor-ir__node` span that keeps its source delimiters in
//! `vditor-ir__marker` spans. A node gets the `--expand` class while the caret sits in or
//! right next to it, which is what makes the editor show its markers. Code, math and raw
//! HTML blocks pair the editable source with a `data-render="2"` preview.

use caret_ast::{LinkType, ListKind, NodeId, NodeKind, Tree};

use crate::code::{info_language, is_no_highlight_language};
use crate::cursor::{CARET, FRONT_END_CARET, ZWSP, is_empty_content, strip_caret, strip_spacers};
use crate::escape::escape_html;
use crate::ial::{Attrs, push_attr};
use crate::renderer::{RenderBackend, Renderer, Walk};
use crate::sanitize::is_script_url;
use crate::wysiwyg::{ANCHOR_SVG, has_task_marker, list_marker, list_tag};

/// Prefix of heading ids in the IR DOM.
const HEADING_ID_PREFIX: &str = "ir-";

const MARKER: &str = "vditor-ir__marker";
const MARKER_BI: &str = "vditor-ir__marker vditor-ir__marker--bi";
const MARKER_S: &str = "vditor-ir__marker vditor-ir__marker--s";
const MARKER_BRACKET: &str = "vditor-ir__marker vditor-ir__marker--bracket";
const MARKER_PAREN: &str = "vditor-ir__marker vditor-ir__marker--paren";
const MARKER_LINK: &str = "vditor-ir__marker vditor-ir__marker--link";
const MARKER_BRACE: &str = "vditor-ir__marker vditor-ir__marker--brace";
const MARKER_HEADING: &str = "vditor-ir__marker vditor-ir__marker--heading";

/// Instant-rendering backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrBackend;

type Ir<'t> = Renderer<'t, IrBackend>;

impl RenderBackend for IrBackend {
    const NAME: &'static str = "ir";
    type State = ();

    fn render_node(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
        match r.kind(node) {
            NodeKind::Document
            | NodeKind::HeadingC8hMarker
            | NodeKind::BlockquoteMarker
            | NodeKind::Less
            | NodeKind::Greater
            | NodeKind::EmojiAlias
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
            | NodeKind::GitConflictCloseMarker => Walk::Continue,
            NodeKind::Paragraph => paragraph(r, node, entering),
            NodeKind::Text => {
                if entering {
                    let tokens = strip_spacers(r.tree.tokens(node));
                    let tokens = r.spaced(&tokens);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::Heading => heading(r, node, entering),
            NodeKind::HeadingId => {
                if entering {
                    let id = r.tokens(node);
                    r.tag("span", &[("data-type", "heading-id"), ("class", MARKER)], false);
                    r.write_escaped(&format!(" {{{id}}}"));
                    r.close_tag("span");
                }
                Walk::Continue
            }
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
            NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Strikethrough
            | NodeKind::Mark
            | NodeKind::Sup
            | NodeKind::Sub
            | NodeKind::Underline
            | NodeKind::Kbd
            | NodeKind::Tag
            | NodeKind::CodeSpan
            | NodeKind::InlineMath => inline_node(r, node, entering),
            NodeKind::EmA6kOpenMarker => open_marker(r, entering, "em", "*", MARKER_BI),
            NodeKind::EmU8eOpenMarker => open_marker(r, entering, "em", "_", MARKER_BI),
            NodeKind::StrongA6kOpenMarker => open_marker(r, entering, "strong", "**", MARKER_BI),
            NodeKind::StrongU8eOpenMarker => open_marker(r, entering, "strong", "__", MARKER_BI),
            NodeKind::Strikethrough1OpenMarker => open_marker(r, entering, "s", "~", MARKER_S),
            NodeKind::Strikethrough2OpenMarker => open_marker(r, entering, "s", "~~", MARKER_S),
            NodeKind::Mark1OpenMarker => open_marker(r, entering, "mark", "=", MARKER),
            NodeKind::Mark2OpenMarker => open_marker(r, entering, "mark", "==", MARKER),
            NodeKind::SupOpenMarker => open_marker(r, entering, "sup", "^", MARKER),
            NodeKind::SubOpenMarker => open_marker(r, entering, "sub", "~", MARKER),
            NodeKind::UnderlineOpenMarker => open_marker(r, entering, "u", "<u>", MARKER),
            NodeKind::KbdOpenMarker => open_marker(r, entering, "kbd", "<kbd>", MARKER),
            NodeKind::TagOpenMarker => open_marker(r, entering, "span", "#", MARKER),
            NodeKind::EmA6kCloseMarker => close_marker(r, entering, "em", "*", MARKER_BI),
            NodeKind::EmU8eCloseMarker => close_marker(r, entering, "em", "_", MARKER_BI),
            NodeKind::StrongA6kCloseMarker => close_marker(r, entering, "strong", "**", MARKER_BI),
            NodeKind::StrongU8eCloseMarker => close_marker(r, entering, "strong", "__", MARKER_BI),
            NodeKind::Strikethrough1CloseMarker => close_marker(r, entering, "s", "~", MARKER_S),
            NodeKind::Strikethrough2CloseMarker => close_marker(r, entering, "s", "~~", MARKER_S),
            NodeKind::Mark1CloseMarker => close_marker(r, entering, "mark", "=", MARKER),
            NodeKind::Mark2CloseMarker => close_marker(r, entering, "mark", "==", MARKER),
            NodeKind::SupCloseMarker => close_marker(r, entering, "sup", "^", MARKER),
            NodeKind::SubCloseMarker => close_marker(r, entering, "sub", "~", MARKER),
            NodeKind::UnderlineCloseMarker => close_marker(r, entering, "u", "</u>", MARKER),
            NodeKind::KbdCloseMarker => close_marker(r, entering, "kbd", "</kbd>", MARKER),
            NodeKind::TagCloseMarker => close_marker(r, entering, "span", "#", MARKER),
            NodeKind::CodeSpanOpenMarker => code_span_open_marker(r, node, entering),
            NodeKind::CodeSpanContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::CodeSpanCloseMarker => code_span_close_marker(r, node, entering),
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
            NodeKind::CodeBlockFenceOpenMarker => {
                if entering {
                    let tokens = r.tokens(node);
                    typed_span(r, "code-block-open-marker", &tokens);
                }
                Walk::Continue
            }
            NodeKind::CodeBlockFenceInfoMarker => {
                if entering {
                    let info = r.tree.node(node).code_block_info.clone();
                    code_block_info(r, &info);
                }
                Walk::Continue
            }
            NodeKind::CodeBlockFenceCloseMarker => {
                if entering {
                    let tokens = r.tokens(node);
                    typed_span(r, "code-block-close-marker", &tokens);
                }
                Walk::Continue
            }
            NodeKind::CodeBlockCode => code_block_code(r, node, entering),
            NodeKind::MathBlock | NodeKind::YamlFrontMatter | NodeKind::GitConflict => {
                if entering {
                    div_node(r, node);
                } else {
                    r.write("</div>");
                }
                Walk::Continue
            }
            NodeKind::MathBlockOpenMarker => {
                if entering {
                    typed_span(r, "math-block-open-marker", "$$");
                }
                Walk::Continue
            }
            NodeKind::MathBlockContent => math_block_content(r, node, entering),
            NodeKind::MathBlockCloseMarker => {
                if entering {
                    typed_span(r, "math-block-close-marker", "$$");
                }
                Walk::Continue
            }
            NodeKind::InlineMathOpenMarker => {
                if entering {
                    marker_span(r, MARKER, "$");
                    r.tag(
                        "code",
                        &[
                            ("data-newline", "1"),
                            ("class", "vditor-ir__marker vditor-ir__marker--pre"),
                            ("data-type", "math-inline"),
                        ],
                        false,
                    );
                }
                Walk::Continue
            }
            NodeKind::InlineMathContent => inline_math_content(r, node, entering),
            NodeKind::InlineMathCloseMarker => {
                if entering {
                    marker_span(r, MARKER, "$");
                }
                Walk::Continue
            }
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
            NodeKind::Link => {
                if entering {
                    r.spacer_before(node);
                    span_node(r, node);
                } else {
                    r.close_tag("span");
                }
                Walk::Continue
            }
            NodeKind::Image => image(r, node, entering),
            NodeKind::Bang => {
                if entering {
                    marker_span(r, MARKER, "!");
                }
                Walk::Continue
            }
            NodeKind::OpenBracket => {
                if entering {
                    marker_span(r, MARKER_BRACKET, "[");
                }
                Walk::Continue
            }
            NodeKind::CloseBracket => close_bracket(r, node, entering),
            NodeKind::OpenParen | NodeKind::CloseParen => {
                if entering && !in_reference_link(r.tree(), node) {
                    let tokens = r.tokens(node);
                    marker_span(r, MARKER_PAREN, &tokens);
                }
                Walk::Continue
            }
            NodeKind::LinkDest => link_dest(r, node, entering),
            NodeKind::LinkSpace => {
                if entering && !in_reference_link(r.tree(), node) {
                    r.write_char(' ');
                }
                Walk::Continue
            }
            NodeKind::LinkTitle => {
                if entering && !in_reference_link(r.tree(), node) {
                    let title = r.tokens(node);
                    marker_span(r, "vditor-ir__marker vditor-ir__marker--title", &format!("\"{title}\""));
                }
                Walk::Continue
            }
            NodeKind::LinkText => link_text(r, node, entering),
            NodeKind::OpenBrace | NodeKind::CloseBrace => {
                if entering {
                    let tokens = r.tokens(node);
                    marker_span(r, MARKER_BRACE, &tokens);
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
                if entering {
                    span_node(r, node);
                    marker_span(r, MARKER_BI, "\\");
                } else {
                    r.close_tag("span");
                }
                Walk::Continue
            }
            NodeKind::BackslashContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.write_escaped(&tokens);
                }
                Walk::Continue
            }
            NodeKind::Emoji => {
                if entering {
                    r.spacer_before(node);
                    span_node(r, node);
                } else {
                    r.close_tag("span");
                }
                Walk::Continue
            }
            NodeKind::EmojiImg | NodeKind::EmojiUnicode => {
                if entering {
                    let tokens = r.tokens(node);
                    let alias = r.tree.first_child(node).map(|c| r.tokens(c)).unwrap_or_default();
                    r.tag("span", &[("data-render", "2")], false);
                    r.write(&tokens);
                    r.close_tag("span");
                    marker_span(r, MARKER, &alias);
                }
                Walk::SkipChildren
            }
            NodeKind::YamlFrontMatterOpenMarker => {
                if entering {
                    let tokens = r.tokens(node);
                    typed_span(r, "yaml-front-matter-open-marker", &tokens);
                }
                Walk::Continue
            }
            NodeKind::YamlFrontMatterContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.tag("pre", &[("class", "vditor-ir__marker--pre")], false);
                    r.tag(
                        "code",
                        &[("data-type", "yaml-front-matter"), ("class", "language-yaml")],
                        false,
                    );
                    write_source(r, tokens.trim());
                    r.write("</code></pre>");
                }
                Walk::Continue
            }
            NodeKind::YamlFrontMatterCloseMarker => {
                if entering {
                    let tokens = r.tokens(node);
                    typed_span(r, "yaml-front-matter-close-marker", &tokens);
                }
                Walk::Continue
            }
            NodeKind::FootnotesDefBlock => {
                if r.rendering_footnotes() {
                    return Walk::SkipChildren;
                }
                if entering {
                    r.write(r#"<div data-block="0" data-type="footnotes-block">"#);
                    r.render_footnote_defs();
                } else {
                    r.write("</div>");
                }
                Walk::SkipChildren
            }
            NodeKind::FootnotesDef => {
                if entering {
                    let label = r.tokens(node);
                    r.write(r#"<div data-type="footnotes-def">"#);
                    r.write_escaped(&format!("[{label}]: "));
                } else {
                    r.write("</div>");
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
                    div_node(r, node);
                    let script = r.child_tokens(node, NodeKind::BlockQueryEmbedScript);
                    r.tag("pre", &[("class", "vditor-ir__marker--pre")], false);
                    r.tag("code", &[("data-type", "block-query-embed")], false);
                    write_source(r, &script);
                    r.write("</code></pre></div>");
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
            NodeKind::GitConflictContent => {
                if entering {
                    let tokens = r.tokens(node);
                    r.tag("pre", &[("class", "vditor-ir__marker--pre")], false);
                    r.tag("code", &[("data-type", "git-conflict")], false);
                    write_source(r, tokens.trim());
                    r.write("</code></pre>");
                }
                Walk::Continue
            }
        }
    }
}

/// Source text of `node` as the editor sees it: every token that can hold the caret.
fn ir_text(tree: &Tree, node: NodeId) -> String {
    let mut text = String::new();
    for n in tree.descendants(node) {
        let data = tree.node(n);
        match data.kind {
            NodeKind::Text
            | NodeKind::LinkText
            | NodeKind::LinkDest
            | NodeKind::LinkTitle
            | NodeKind::CodeBlockCode
            | NodeKind::CodeSpanContent
            | NodeKind::InlineMathContent
            | NodeKind::MathBlockContent
            | NodeKind::YamlFrontMatterContent
            | NodeKind::HtmlBlock
            | NodeKind::InlineHtml
            | NodeKind::EmojiAlias => text.push_str(&data.tokens),
            NodeKind::CodeBlockFenceInfoMarker => text.push_str(&data.code_block_info),
            NodeKind::Link if data.link_type == LinkType::Reference => {
                text.push_str(&data.link_ref_label);
            }
            _ => {}
        }
    }
    text
}

fn node_class(expand: bool) -> &'static str {
    if expand {
        "vditor-ir__node vditor-ir__node--expand"
    } else {
        "vditor-ir__node"
    }
}

/// Whether the caret is inside `node` or touches it from either side.
fn caret_at(tree: &Tree, node: NodeId) -> bool {
    ir_text(tree, node).contains(CARET)
        || tree.previous_node_text(node).ends_with(CARET)
        || tree.next_node_text(node).starts_with(CARET)
}

/// Opening `vditor-ir__node` span of an inline node.
fn span_node(r: &mut Ir<'_>, node: NodeId) {
    let n = r.tree.node(node);
    let data_type = match n.kind {
        NodeKind::Emphasis => "em",
        NodeKind::Strong => "strong",
        NodeKind::Strikethrough => "s",
        NodeKind::Mark => "mark",
        NodeKind::Sup => "sup",
        NodeKind::Sub => "sub",
        NodeKind::Tag => "tag",
        NodeKind::Link if n.link_type == LinkType::Reference => "link-ref",
        NodeKind::Link => "a",
        NodeKind::Image => "img",
        NodeKind::CodeSpan => "code",
        NodeKind::InlineMath => "inline-math",
        NodeKind::Emoji => "emoji",
        NodeKind::InlineHtml => "html-inline",
        NodeKind::HtmlEntity => "html-entity",
        NodeKind::Backslash => "backslash",
        _ => "inline-node",
    };
    let class = node_class(caret_at(r.tree(), node));
    r.tag("span", &[("data-type", data_type), ("class", class)], false);
}

/// Opening `vditor-ir__node` div of a source block.
fn div_node(r: &mut Ir<'_>, node: NodeId) {
    let data_type = match r.kind(node) {
        NodeKind::CodeBlock => "code-block",
        NodeKind::MathBlock => "math-block",
        NodeKind::YamlFrontMatter => "yaml-front-matter",
        NodeKind::BlockQueryEmbed => "block-query-embed",
        NodeKind::GitConflict => "git-conflict",
        _ => "html-block",
    };
    let class = node_class(ir_text(r.tree(), node).contains(CARET));
    r.tag(
        "div",
        &[("data-block", "0"), ("data-type", data_type), ("class", class)],
        false,
    );
}

fn marker_span(r: &mut Ir<'_>, class: &str, tokens: &str) {
    r.tag("span", &[("class", class)], false);
    r.write_escaped(tokens);
    r.close_tag("span");
}

fn typed_span(r: &mut Ir<'_>, data_type: &str, tokens: &str) {
    r.tag("span", &[("data-type", data_type)], false);
    r.write_escaped(tokens);
    r.close_tag("span");
}

/// Escaped source, or `<wbr>` and a newline when there is nothing but the caret.
fn write_source(r: &mut Ir<'_>, source: &str) {
    if is_empty_content(source) {
        r.write(FRONT_END_CARET);
        r.write_char('\n');
    } else {
        r.write_escaped(source);
    }
}

fn inline_node(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if entering {
        span_node(r, node);
    } else {
        r.close_tag("span");
    }
    Walk::Continue
}

fn open_marker(r: &mut Ir<'_>, entering: bool, name: &str, marker: &str, class: &str) -> Walk {
    if entering {
        marker_span(r, class, marker);
        r.tag(name, &[("data-newline", "1")], false);
    }
    Walk::Continue
}

fn close_marker(r: &mut Ir<'_>, entering: bool, name: &str, marker: &str, class: &str) -> Walk {
    if entering {
        r.close_tag(name);
        marker_span(r, class, marker);
    }
    Walk::Continue
}

fn paragraph(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
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

fn heading(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    let n = r.tree.node(node);
    let level = n.heading_level.clamp(1, 6);
    let setext = n.heading_setext;
    if !entering {
        if setext {
            let underline = if level == 1 { "=" } else { "-" };
            let underline = underline.repeat(setext_len(r.tree(), node));
            r.tag(
                "span",
                &[
                    ("class", MARKER_HEADING),
                    ("data-type", "heading-marker"),
                    ("data-render", "2"),
                ],
                false,
            );
            r.write_char('\n');
            r.write(&underline);
            r.close_tag("span");
        }
        r.close_tag(&format!("h{level}"));
        return Walk::Continue;
    }

    let normalized = r.heading_id(node);
    let n = r.tree.node(node);
    let expand = ir_text(r.tree(), node).contains(CARET)
        || r
            .tree
            .child_by_kind(node, NodeKind::HeadingId)
            .is_some_and(|id| r.tree.tokens(id).contains(CARET));
    let id = match n.ial_attr("id") {
        Some(id) => id.to_owned(),
        None => format!("{HEADING_ID_PREFIX}{normalized}"),
    };
    let marker = match (setext, level) {
        (false, _) => "#",
        (true, 1) => "=",
        (true, _) => "-",
    };
    r.tag(
        &format!("h{level}"),
        &[
            ("data-block", "0"),
            ("class", node_class(expand)),
            ("id", id.as_str()),
            ("data-marker", marker),
        ],
        false,
    );
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
    if !setext {
        r.tag(
            "span",
            &[("class", MARKER_HEADING), ("data-type", "heading-marker")],
            false,
        );
        r.write(&"#".repeat(usize::from(level)));
        r.write_char(' ');
        r.close_tag("span");
    }
    Walk::Continue
}

/// Width of the last line of a setext heading. Wide characters count twice; an empty
/// heading still gets three underline characters.
fn setext_len(tree: &Tree, heading: NodeId) -> usize {
    let mut content = String::new();
    for n in tree.descendants(heading) {
        if matches!(
            tree.kind(n),
            NodeKind::Text | NodeKind::LinkText | NodeKind::SoftBreak
        ) {
            content.push_str(tree.tokens(n));
        }
    }
    let content = strip_caret(&content);
    let last_line = content.rsplit('\n').next().unwrap_or_default();
    let len: usize = last_line
        .chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum();
    if len == 0 { 3 } else { len }
}

fn list(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    let data = r.tree.node(node).list.clone();
    let name = list_tag(&data);
    if !entering {
        r.close_tag(name);
        return Walk::Continue;
    }
    let mut attrs = Attrs::new();
    if data.tight {
        push_attr(&mut attrs, "data-tight", "true");
    }
    if data.bullet_char.is_none() && data.start != 1 {
        push_attr(&mut attrs, "start", data.start.to_string());
    }
    push_attr(&mut attrs, "data-marker", list_marker(&data));
    push_attr(&mut attrs, "data-block", "0");
    r.tag(name, &attrs, false);
    Walk::Continue
}

fn list_item(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        r.close_tag("li");
        return Walk::Continue;
    }
    let data = &r.tree.node(node).list;
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "data-marker", list_marker(data));
    if data.kind == ListKind::Task && has_task_marker(r.tree(), node) {
        push_attr(&mut attrs, "class", r.options.task_list_item_class.clone());
    }
    r.tag("li", &attrs, false);
    Walk::Continue
}

fn code_span_open_marker(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let len = r
        .tree
        .parent(node)
        .map_or(1, |span| r.tree.node(span).code_marker_len.max(1));
    let padded = r
        .tree
        .next(node)
        .is_some_and(|content| r.tree.tokens(content).starts_with('`'));
    r.tag("span", &[("class", MARKER)], false);
    r.write(&"`".repeat(len));
    if padded {
        r.write_char(' ');
    }
    r.close_tag("span");
    r.tag("code", &[("data-newline", "1")], false);
    Walk::Continue
}

fn code_span_close_marker(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let len = r
        .tree
        .parent(node)
        .map_or(1, |span| r.tree.node(span).code_marker_len.max(1));
    let padded = r
        .tree
        .prev(node)
        .is_some_and(|content| r.tree.tokens(content).ends_with('`'));
    r.write("</code>");
    r.tag("span", &[("class", MARKER)], false);
    if padded {
        r.write_char(' ');
    }
    r.write(&"`".repeat(len));
    r.close_tag("span");
    Walk::Continue
}

fn code_block(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    let fenced = r.tree.node(node).fenced;
    if entering {
        div_node(r, node);
        // Indented blocks are edited as fenced ones.
        if !fenced {
            typed_span(r, "code-block-open-marker", "```");
            code_block_info(r, "");
        }
    } else {
        if !fenced {
            typed_span(r, "code-block-close-marker", "```");
        }
        r.write("</div>");
    }
    Walk::Continue
}

fn code_block_info(r: &mut Ir<'_>, info: &str) {
    r.tag(
        "span",
        &[
            ("class", "vditor-ir__marker vditor-ir__marker--info"),
            ("data-type", "code-block-info"),
        ],
        false,
    );
    r.write(ZWSP);
    r.write_escaped(info);
    r.close_tag("span");
}

fn code_block_code(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
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
    let pre_class = if preview {
        "vditor-ir__marker--pre vditor-ir__marker"
    } else {
        "vditor-ir__marker--pre"
    };
    r.tag("pre", &[("class", pre_class)], false);
    r.tag("code", &code_attrs, false);
    if is_empty_content(&code) {
        if !caret_in_info {
            r.write(FRONT_END_CARET);
        }
        r.write_char('\n');
    } else {
        r.write_escaped(&code);
        r.newline();
    }
    r.write("</code></pre>");

    if preview {
        r.tag("pre", &[("class", "vditor-ir__preview"), ("data-render", "2")], false);
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

fn math_block_content(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    let source = tokens.trim();
    let preview = r.options.math_block_preview;
    let pre_class = if preview {
        "vditor-ir__marker--pre vditor-ir__marker"
    } else {
        "vditor-ir__marker--pre"
    };
    r.tag("pre", &[("class", pre_class)], false);
    r.tag("code", &[("data-type", "math-block"), ("class", "language-math")], false);
    write_source(r, source);
    r.write("</code></pre>");
    if preview {
        r.tag("pre", &[("class", "vditor-ir__preview"), ("data-render", "2")], false);
        r.tag("div", &[("data-type", "math-block"), ("class", "language-math")], false);
        r.write_escaped(&strip_caret(source));
        r.write("</div></pre>");
    }
    Walk::Continue
}

fn inline_math_content(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    r.write_escaped(&tokens);
    r.write("</code>");
    let mut preview = strip_caret(&tokens);
    if r.tree.parent_is(node, NodeKind::TableCell) {
        preview = preview.replace("\\|", "|");
    }
    r.tag("span", &[("class", "vditor-ir__preview"), ("data-render", "2")], false);
    r.tag("span", &[("class", "language-math")], false);
    r.write_escaped(&preview);
    r.write("</span></span>");
    Walk::Continue
}

fn table(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    let Some(head) = r.tree.first_child(node) else {
        return Walk::SkipChildren;
    };
    if entering {
        r.tag("table", &[("data-block", "0"), ("data-type", "table")], false);
    } else {
        if r.tree.next(head).is_some() {
            r.close_tag("tbody");
        }
        r.close_tag("table");
    }
    Walk::Continue
}

fn table_cell(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
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

/// Whether `node` is a destination part of a `[text][label]` link, which shows the label
/// instead.
fn in_reference_link(tree: &Tree, node: NodeId) -> bool {
    tree.parent(node).is_some_and(|p| {
        tree.kind(p) == NodeKind::Link && tree.node(p).link_type == LinkType::Reference
    })
}

fn close_bracket(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    marker_span(r, MARKER_BRACKET, "]");
    let Some(parent) = r.tree.parent(node) else {
        return Walk::Continue;
    };
    let p = r.tree.node(parent);
    if matches!(p.kind, NodeKind::Link | NodeKind::Image) && p.link_type == LinkType::Reference {
        let label = p.link_ref_label.clone();
        let text = r.child_tokens(parent, NodeKind::LinkText);
        if !strip_caret(&text).eq_ignore_ascii_case(&strip_caret(&label)) {
            marker_span(r, MARKER_LINK, &format!("[{label}]"));
        }
    }
    Walk::Continue
}

fn link_dest(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering || in_reference_link(r.tree(), node) {
        return Walk::Continue;
    }
    let mut dest = r.tokens(node);
    if r.options.sanitize && is_script_url(&dest) {
        dest.clear();
    }
    marker_span(r, MARKER_LINK, &dest);
    Walk::Continue
}

fn link_text(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let parent = r.tree.parent(node).map(|p| r.tree.node(p));
    let class = match parent {
        Some(p) if p.kind == NodeKind::Image => Some(MARKER_BRACKET),
        Some(p) if p.kind == NodeKind::Link && p.link_type == LinkType::Reference => None,
        _ => Some("vditor-ir__link"),
    };
    match class {
        Some(class) => r.tag("span", &[("class", class)], false),
        None => r.open_tag("span"),
    }
    let tokens = r.tokens(node);
    r.write_escaped(&tokens);
    r.close_tag("span");
    Walk::Continue
}

fn image(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    let reference = r.tree.node(node).link_type == LinkType::Reference;
    let reset_caret = r
        .tree
        .next(node)
        .is_some_and(|n| r.kind(n) == NodeKind::Text && r.tree.tokens(n).starts_with(CARET));
    if entering {
        if reference {
            // The label stands in for the destination.
            let children: Vec<_> = r.tree.children(node).collect();
            for c in children {
                if matches!(
                    r.kind(c),
                    NodeKind::OpenParen
                        | NodeKind::LinkDest
                        | NodeKind::LinkSpace
                        | NodeKind::LinkTitle
                        | NodeKind::CloseParen
                ) {
                    r.tree.unlink(c);
                }
            }
        }
        r.spacer_before(node);
        let expand = ir_text(r.tree(), node).contains(CARET) || reset_caret;
        let class = node_class(expand);
        r.tag("span", &[("class", class), ("data-type", "img")], false);
        return Walk::Continue;
    }

    if reset_caret && let Some(next) = r.tree.next(node) {
        r.write(CARET);
        let text = r.tree.node_mut(next);
        text.tokens = text.tokens.replacen(CARET, "", 1);
    }
    let mut dest = r.link_dest(node);
    if r.options.sanitize && is_script_url(&dest) {
        dest.clear();
    }
    let mut attrs = Attrs::new();
    push_attr(&mut attrs, "src", escape_html(&strip_caret(&r.resolve_link(&dest))));
    let alt = strip_caret(&r.child_tokens(node, NodeKind::LinkText));
    if !alt.is_empty() {
        push_attr(&mut attrs, "alt", escape_html(&alt));
    }
    let title = if reference {
        let label = r.tree.node(node).link_ref_label.clone();
        r.find_link_ref_link(&label)
            .map(|link| r.child_tokens(link, NodeKind::LinkTitle))
            .unwrap_or_default()
    } else {
        r.child_tokens(node, NodeKind::LinkTitle)
    };
    if !title.is_empty() {
        push_attr(&mut attrs, "title", escape_html(&strip_caret(&title)));
    }
    r.open_fragment();
    r.tag("img", &attrs, true);
    r.close_fragment();
    r.close_tag("span");
    Walk::Continue
}

fn html_block(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    let tokens = tokens.trim();
    div_node(r, node);
    r.tag("pre", &[("class", "vditor-ir__marker--pre vditor-ir__marker")], false);
    r.tag("code", &[("data-type", "html-block")], false);
    r.write_escaped(tokens);
    r.write("</code></pre>");
    r.tag("pre", &[("class", "vditor-ir__preview"), ("data-render", "2")], false);
    let preview = r.sanitized(&strip_caret(tokens));
    r.write(&preview);
    r.write("</pre></div>");
    Walk::SkipChildren
}

/// Whether a sibling on the `forward` side of `node` is inline HTML with `tokens`.
fn has_inline_html_sibling(tree: &Tree, node: NodeId, tokens: &str, forward: bool) -> bool {
    let step = |n: NodeId| if forward { tree.next(n) } else { tree.prev(n) };
    let mut sibling = step(node);
    while let Some(s) = sibling {
        if tree.kind(s) == NodeKind::InlineHtml && tree.tokens(s) == tokens {
            return true;
        }
        sibling = step(s);
    }
    false
}

fn inline_html(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let tokens = r.tokens(node);
    let opens_kbd = tokens == "<kbd>" && has_inline_html_sibling(r.tree(), node, "</kbd>", true);
    let closes_kbd =
        tokens == "</kbd>" && has_inline_html_sibling(r.tree(), node, "<kbd>", false);
    if closes_kbd {
        r.write("</kbd>");
    }
    span_node(r, node);
    r.tag("code", &[("class", MARKER)], false);
    r.write_escaped(&tokens);
    r.write("</code></span>");
    if opens_kbd {
        r.write("<kbd>");
    }
    Walk::Continue
}

fn html_entity(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    let entity = r.tree.node(node).html_entity_tokens.clone();
    span_node(r, node);
    r.tag(
        "code",
        &[
            ("data-newline", "1"),
            ("class", "vditor-ir__marker vditor-ir__marker--pre"),
            ("data-type", "html-entity"),
        ],
        false,
    );
    r.write_escaped(&entity);
    r.write("</code>");
    r.tag("span", &[("class", "vditor-ir__preview"), ("data-render", "2")], false);
    r.open_tag("code");
    r.write(&strip_caret(&entity));
    r.write("</code></span></span>");
    Walk::Continue
}

fn footnotes_ref(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    r.spacer_before(node);
    let tokens = r.tokens(node);
    let (index, def) = r.footnote_index(&tokens);
    let tooltip = r.footnote_tooltip(def);
    let label = escape_html(&r.tree.node(node).footnotes_ref_label);
    let class = if tokens.contains(CARET) {
        "vditor-ir__node vditor-ir__node--expand vditor-tooltipped vditor-tooltipped__s"
    } else {
        "vditor-ir__node vditor-tooltipped vditor-tooltipped__s"
    };
    r.tag(
        "sup",
        &[
            ("data-type", "footnotes-ref"),
            ("class", class),
            ("aria-label", tooltip.as_str()),
            ("data-footnotes-label", label.as_str()),
        ],
        false,
    );
    marker_span(r, MARKER_BRACKET, "[");
    marker_span(r, MARKER_LINK, &tokens);
    r.tag(
        "span",
        &[("class", "vditor-ir__marker--hide"), ("data-render", "1")],
        false,
    );
    r.write(&index.to_string());
    r.close_tag("span");
    marker_span(r, MARKER_BRACKET, "]");
    r.close_tag("sup");
    r.write(ZWSP);
    Walk::Continue
}

fn block_ref(r: &mut Ir<'_>, node: NodeId, entering: bool) -> Walk {
    if !entering {
        return Walk::Continue;
    }
    r.spacer_before(node);
    let id = r.child_tokens(node, NodeKind::BlockRefId);
    let text = r
        .tree
        .child_by_kind(node, NodeKind::BlockRefText)
        .or_else(|| r.tree.child_by_kind(node, NodeKind::BlockRefDynamicText))
        .map(|t| r.tree.text(t))
        .unwrap_or_default();
    span_node(r, node);
    marker_span(r, MARKER, "((");
    marker_span(r, MARKER_LINK, &id);
    if !text.is_empty() {
        r.write_char(' ');
        r.tag("span", &[("class", "vditor-ir__blockref")], false);
        r.write_escaped(&text);
        r.close_tag("span");
    }
    marker_span(r, MARKER, "))");
    r.close_tag("span");
    Walk::SkipChildren
}
