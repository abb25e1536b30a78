//! Sentinels of the edit cursor protocol.
//!
//! The parser leaves [`CARET`] inside text tokens where the editor's cursor sits. Renderers
//! keep it in element content, drop it from attribute values, and write
//! [`FRONT_END_CARET`] into code and math content that would otherwise be empty. Inline
//! constructs that start a line get a [`ZWSP`] spacer so the browser can place the cursor
//! before them.

pub use caret_ast::CARET;

/// Zero-width space used as a cursor spacer.
pub const ZWSP: &str = "\u{200b}";

/// Caret glyph understood by the editor front end.
pub const FRONT_END_CARET: &str = "<wbr>";

/// Stands in for a newline inside IAL values.
pub const IAL_ESC_NEWLINE: &str = "_esc_newline_";

/// Remove every caret.
#[must_use]
pub fn strip_caret(s: &str) -> String {
    s.replace(CARET, "")
}

/// Text content with stale spacers removed.
///
/// Spacers only survive when they are the whole content next to the caret.
#[must_use]
pub fn strip_spacers(tokens: &str) -> String {
    let keep = tokens.len() == CARET.len() + ZWSP.len()
        && tokens.starts_with(CARET)
        && tokens.ends_with(ZWSP);
    if keep {
        tokens.to_owned()
    } else {
        tokens.replace(ZWSP, "")
    }
}

/// Restore newlines escaped inside an IAL value.
#[must_use]
pub fn unescape_ial(value: &str) -> String {
    value.replace(IAL_ESC_NEWLINE, "\n")
}

/// Whether code or math content counts as empty: only whitespace, or only the caret.
#[must_use]
pub fn is_empty_content(tokens: &str) -> bool {
    let tokens = tokens.trim();
    tokens.is_empty() || tokens == CARET
}
