//! The closed set of node kinds.

macro_rules! node_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Kind of a tree node.
        ///
        /// Every kind has a canonical name (`NodeParagraph`, `NodeHTMLBlock`, ...) used for
        /// `data-type` attributes and the JSON tree format.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum NodeKind {
            #[default]
            $($variant),+
        }

        impl NodeKind {
            /// All kinds in declaration order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant),+];

            /// Canonical name of the kind.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => $name),+
                }
            }
        }
    };
}

node_kinds! {
    Document => "NodeDocument",
    Paragraph => "NodeParagraph",
    Heading => "NodeHeading",
    HeadingC8hMarker => "NodeHeadingC8hMarker",
    HeadingId => "NodeHeadingID",
    ThematicBreak => "NodeThematicBreak",
    Blockquote => "NodeBlockquote",
    BlockquoteMarker => "NodeBlockquoteMarker",
    List => "NodeList",
    ListItem => "NodeListItem",
    TaskListItemMarker => "NodeTaskListItemMarker",
    HtmlBlock => "NodeHTMLBlock",
    InlineHtml => "NodeInlineHTML",
    HtmlEntity => "NodeHTMLEntity",
    CodeBlock => "NodeCodeBlock",
    CodeBlockFenceOpenMarker => "NodeCodeBlockFenceOpenMarker",
    CodeBlockFenceInfoMarker => "NodeCodeBlockFenceInfoMarker",
    CodeBlockCode => "NodeCodeBlockCode",
    CodeBlockFenceCloseMarker => "NodeCodeBlockFenceCloseMarker",
    Text => "NodeText",
    Emphasis => "NodeEmphasis",
    EmA6kOpenMarker => "NodeEmA6kOpenMarker",
    EmA6kCloseMarker => "NodeEmA6kCloseMarker",
    EmU8eOpenMarker => "NodeEmU8eOpenMarker",
    EmU8eCloseMarker => "NodeEmU8eCloseMarker",
    Strong => "NodeStrong",
    StrongA6kOpenMarker => "NodeStrongA6kOpenMarker",
    StrongA6kCloseMarker => "NodeStrongA6kCloseMarker",
    StrongU8eOpenMarker => "NodeStrongU8eOpenMarker",
    StrongU8eCloseMarker => "NodeStrongU8eCloseMarker",
    CodeSpan => "NodeCodeSpan",
    CodeSpanOpenMarker => "NodeCodeSpanOpenMarker",
    CodeSpanContent => "NodeCodeSpanContent",
    CodeSpanCloseMarker => "NodeCodeSpanCloseMarker",
    HardBreak => "NodeHardBreak",
    SoftBreak => "NodeSoftBreak",
    Br => "NodeBr",
    Link => "NodeLink",
    Image => "NodeImage",
    Bang => "NodeBang",
    OpenBracket => "NodeOpenBracket",
    CloseBracket => "NodeCloseBracket",
    OpenParen => "NodeOpenParen",
    CloseParen => "NodeCloseParen",
    Less => "NodeLess",
    Greater => "NodeGreater",
    LinkText => "NodeLinkText",
    LinkDest => "NodeLinkDest",
    LinkTitle => "NodeLinkTitle",
    LinkSpace => "NodeLinkSpace",
    LinkRefDefBlock => "NodeLinkRefDefBlock",
    LinkRefDef => "NodeLinkRefDef",
    Strikethrough => "NodeStrikethrough",
    Strikethrough1OpenMarker => "NodeStrikethrough1OpenMarker",
    Strikethrough1CloseMarker => "NodeStrikethrough1CloseMarker",
    Strikethrough2OpenMarker => "NodeStrikethrough2OpenMarker",
    Strikethrough2CloseMarker => "NodeStrikethrough2CloseMarker",
    Table => "NodeTable",
    TableHead => "NodeTableHead",
    TableRow => "NodeTableRow",
    TableCell => "NodeTableCell",
    Emoji => "NodeEmoji",
    EmojiUnicode => "NodeEmojiUnicode",
    EmojiImg => "NodeEmojiImg",
    EmojiAlias => "NodeEmojiAlias",
    MathBlock => "NodeMathBlock",
    MathBlockOpenMarker => "NodeMathBlockOpenMarker",
    MathBlockContent => "NodeMathBlockContent",
    MathBlockCloseMarker => "NodeMathBlockCloseMarker",
    InlineMath => "NodeInlineMath",
    InlineMathOpenMarker => "NodeInlineMathOpenMarker",
    InlineMathContent => "NodeInlineMathContent",
    InlineMathCloseMarker => "NodeInlineMathCloseMarker",
    Backslash => "NodeBackslash",
    BackslashContent => "NodeBackslashContent",
    FootnotesDefBlock => "NodeFootnotesDefBlock",
    FootnotesDef => "NodeFootnotesDef",
    FootnotesRef => "NodeFootnotesRef",
    Toc => "NodeToC",
    YamlFrontMatter => "NodeYamlFrontMatter",
    YamlFrontMatterOpenMarker => "NodeYamlFrontMatterOpenMarker",
    YamlFrontMatterContent => "NodeYamlFrontMatterContent",
    YamlFrontMatterCloseMarker => "NodeYamlFrontMatterCloseMarker",
    BlockRef => "NodeBlockRef",
    BlockRefId => "NodeBlockRefID",
    BlockRefSpace => "NodeBlockRefSpace",
    BlockRefText => "NodeBlockRefText",
    BlockRefDynamicText => "NodeBlockRefDynamicText",
    Mark => "NodeMark",
    Mark1OpenMarker => "NodeMark1OpenMarker",
    Mark1CloseMarker => "NodeMark1CloseMarker",
    Mark2OpenMarker => "NodeMark2OpenMarker",
    Mark2CloseMarker => "NodeMark2CloseMarker",
    Sup => "NodeSup",
    SupOpenMarker => "NodeSupOpenMarker",
    SupCloseMarker => "NodeSupCloseMarker",
    Sub => "NodeSub",
    SubOpenMarker => "NodeSubOpenMarker",
    SubCloseMarker => "NodeSubCloseMarker",
    Underline => "NodeUnderline",
    UnderlineOpenMarker => "NodeUnderlineOpenMarker",
    UnderlineCloseMarker => "NodeUnderlineCloseMarker",
    Kbd => "NodeKbd",
    KbdOpenMarker => "NodeKbdOpenMarker",
    KbdCloseMarker => "NodeKbdCloseMarker",
    Tag => "NodeTag",
    TagOpenMarker => "NodeTagOpenMarker",
    TagCloseMarker => "NodeTagCloseMarker",
    KramdownBlockIal => "NodeKramdownBlockIAL",
    KramdownSpanIal => "NodeKramdownSpanIAL",
    BlockQueryEmbed => "NodeBlockQueryEmbed",
    OpenBrace => "NodeOpenBrace",
    CloseBrace => "NodeCloseBrace",
    BlockQueryEmbedScript => "NodeBlockQueryEmbedScript",
    SuperBlock => "NodeSuperBlock",
    SuperBlockOpenMarker => "NodeSuperBlockOpenMarker",
    SuperBlockLayoutMarker => "NodeSuperBlockLayoutMarker",
    SuperBlockCloseMarker => "NodeSuperBlockCloseMarker",
    GitConflict => "NodeGitConflict",
    GitConflictOpenMarker => "NodeGitConflictOpenMarker",
    GitConflictContent => "NodeGitConflictContent",
    GitConflictCloseMarker => "NodeGitConflictCloseMarker",
    Iframe => "NodeIFrame",
    Audio => "NodeAudio",
    Video => "NodeVideo",
    Widget => "NodeWidget",
}

impl NodeKind {
    /// Look up a kind by its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Whether the kind is a block-level node.
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::Paragraph
                | Self::Heading
                | Self::ThematicBreak
                | Self::Blockquote
                | Self::List
                | Self::ListItem
                | Self::HtmlBlock
                | Self::CodeBlock
                | Self::Table
                | Self::MathBlock
                | Self::FootnotesDefBlock
                | Self::FootnotesDef
                | Self::Toc
                | Self::YamlFrontMatter
                | Self::BlockQueryEmbed
                | Self::KramdownBlockIal
                | Self::SuperBlock
                | Self::GitConflict
                | Self::Iframe
                | Self::Audio
                | Self::Video
                | Self::Widget
        )
    }

    /// Whether the kind carries text that counts as visible content.
    ///
    /// These are the kinds whose tokens make up [`Tree::text`](crate::Tree::text).
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Text | Self::LinkText | Self::BlockRefText | Self::BlockRefDynamicText | Self::FootnotesRef
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(NodeKind::Paragraph.name(), "NodeParagraph");
        assert_eq!(NodeKind::HtmlBlock.name(), "NodeHTMLBlock");
        assert_eq!(NodeKind::Toc.name(), "NodeToC");
        assert_eq!(NodeKind::Iframe.to_string(), "NodeIFrame");
    }

    #[test]
    fn test_from_name_round_trips_every_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(NodeKind::from_name("NodeNope"), None);
    }

    #[test]
    fn test_default_is_document() {
        assert_eq!(NodeKind::default(), NodeKind::Document);
    }
}
