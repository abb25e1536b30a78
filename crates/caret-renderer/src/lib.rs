//! HTML renderers for caret document trees.
//!
//! One traversal dispatcher, [`Renderer`], walks a [`caret_ast::Tree`] and hands every node to a
//! [`RenderBackend`]. Four backends produce the four representations:
//!
//! - [`ExportBackend`]: static export DOM
//! - [`WysiwygBackend`]: WYSIWYG editor DOM
//! - [`IrBackend`]: instant rendering DOM with visible markers
//! - [`BlockBackend`]: block editor DOM with `data-node-index`
//!
//! Shared machinery covers the edit caret protocol ([`CARET`], [`ZWSP`], [`FRONT_END_CARET`]),
//! IAL merging, link resolution, footnote numbering and sanitization of untrusted fragments.
//!
//! # Example
//!
//! ```
//! use caret_ast::parse_markdown;
//! use caret_renderer::{RenderMode, RenderOptions};
//!
//! let mut tree = parse_markdown("a‸b");
//! let html = RenderMode::Wysiwyg
//!     .render(&mut tree, RenderOptions::default())
//!     .unwrap();
//! assert_eq!(html, r#"<p data-block="0">a‸b</p>"#);
//! ```

mod block;
mod buffer;
mod code;
mod cursor;
mod escape;
mod export;
mod heading;
mod ial;
mod ir;
mod mode;
mod options;
mod path;
mod renderer;
mod sanitize;
pub mod space;
mod wysiwyg;

pub use block::{BlockBackend, BlockState};
pub use buffer::Buffer;
pub use code::is_no_highlight_language;
pub use cursor::{
    CARET, FRONT_END_CARET, IAL_ESC_NEWLINE, ZWSP, is_empty_content, strip_caret, strip_spacers,
    unescape_ial,
};
pub use escape::{escape_html, escape_ref_text};
pub use export::ExportBackend;
pub use heading::{HeadingIds, normalize_heading_id};
pub use ial::{Attrs, IdPair, merge_attrs, push_attr, render_panel};
pub use ir::IrBackend;
pub use mode::{RenderMode, UnknownModeError};
pub use options::{OptionsError, RenderOptions};
pub use path::LinkResolver;
pub use renderer::{RenderBackend, Renderer, Walk};
pub use sanitize::{RegexSanitizer, Sanitizer, is_script_url};
pub use wysiwyg::WysiwygBackend;
