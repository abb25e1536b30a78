//! Choosing a backend at run time.

use std::fmt;
use std::str::FromStr;

use caret_ast::Tree;

use crate::block::BlockBackend;
use crate::export::ExportBackend;
use crate::ir::IrBackend;
use crate::options::{OptionsError, RenderOptions};
use crate::renderer::Renderer;
use crate::wysiwyg::WysiwygBackend;

/// One of the four HTML representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RenderMode {
    /// Static export DOM.
    #[default]
    Export,
    /// WYSIWYG editor DOM.
    Wysiwyg,
    /// Instant rendering DOM, markers kept visible.
    Ir,
    /// Block editor DOM.
    Block,
}

impl RenderMode {
    /// All modes, in declaration order.
    pub const ALL: [Self; 4] = [Self::Export, Self::Wysiwyg, Self::Ir, Self::Block];

    /// Lowercase name used in configuration files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Wysiwyg => "wysiwyg",
            Self::Ir => "ir",
            Self::Block => "block",
        }
    }

    /// Render `tree` with the backend of this mode.
    pub fn render(self, tree: &mut Tree, options: RenderOptions) -> Result<String, OptionsError> {
        Ok(match self {
            Self::Export => Renderer::<ExportBackend>::new(tree, options)?.render(),
            Self::Wysiwyg => Renderer::<WysiwygBackend>::new(tree, options)?.render(),
            Self::Ir => Renderer::<IrBackend>::new(tree, options)?.render(),
            Self::Block => Renderer::<BlockBackend>::new(tree, options)?.render(),
        })
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized mode name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown render mode {0:?}, expected one of export, wysiwyg, ir, block")]
pub struct UnknownModeError(pub String);

impl FromStr for RenderMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownModeError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caret_ast::parse_markdown;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_mode() {
        assert_eq!("ir".parse(), Ok(RenderMode::Ir));
        assert_eq!("Block".parse(), Ok(RenderMode::Block));
        assert_eq!(
            "sv".parse::<RenderMode>(),
            Err(UnknownModeError("sv".to_owned()))
        );
    }

    #[test]
    fn test_every_mode_renders_text() {
        for mode in RenderMode::ALL {
            let mut tree = parse_markdown("hello");
            let html = mode.render(&mut tree, RenderOptions::default()).unwrap();
            assert!(html.contains("hello"), "{mode}: {html}");
        }
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = RenderOptions {
            node_index_start: -2,
            ..RenderOptions::default()
        };
        let mut tree = parse_markdown("x");
        assert_eq!(
            RenderMode::Block.render(&mut tree, options),
            Err(OptionsError::NegativeNodeIndex(-2))
        );
    }
}
