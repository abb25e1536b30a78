//! Append-only output sink with nested scratch fragments.

use crate::sanitize::Sanitizer;

/// Output buffer of a render.
///
/// Writes go to the innermost open fragment. Closing a fragment appends its content to the
/// enclosing one, optionally passing it through a [`Sanitizer`] first, so markup assembled
/// across several handler calls can be sanitized as a unit.
#[derive(Debug)]
pub struct Buffer {
    stack: Vec<String>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![String::with_capacity(4096)],
        }
    }

    fn top(&mut self) -> &mut String {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Append a string.
    pub fn push_str(&mut self, s: &str) {
        self.top().push_str(s);
    }

    /// Append a character.
    pub fn push(&mut self, c: char) {
        self.top().push(c);
    }

    /// Last byte written anywhere in the buffer, looking through open fragments.
    #[must_use]
    pub fn last_byte(&self) -> Option<u8> {
        self.stack
            .iter()
            .rev()
            .find_map(|s| s.as_bytes().last().copied())
    }

    /// Write a newline unless the output is empty or already ends with one.
    pub fn newline(&mut self) {
        if !matches!(self.last_byte(), None | Some(b'\n')) {
            self.push('\n');
        }
    }

    /// Start collecting writes into a scratch fragment.
    pub fn open_fragment(&mut self) {
        self.stack.push(String::new());
    }

    /// Number of open fragments.
    #[must_use]
    pub fn fragment_depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Close the innermost fragment and append it to the enclosing buffer.
    ///
    /// With a sanitizer the fragment is cleaned first. Closing with no fragment open is a
    /// no-op.
    pub fn close_fragment(&mut self, sanitizer: Option<&dyn Sanitizer>) {
        if self.stack.len() < 2 {
            tracing::debug!("close_fragment without an open fragment");
            return;
        }
        let Some(fragment) = self.stack.pop() else {
            return;
        };
        match sanitizer {
            Some(s) => {
                let clean = s.sanitize(&fragment);
                self.push_str(&clean);
            }
            None => self.push_str(&fragment),
        }
    }

    /// Finish the buffer, folding any fragments left open into the output unsanitized.
    #[must_use]
    pub fn into_string(mut self) -> String {
        while self.stack.len() > 1 {
            self.close_fragment(None);
        }
        self.stack.pop().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Upper;

    impl Sanitizer for Upper {
        fn sanitize(&self, html: &str) -> String {
            html.to_uppercase()
        }
    }

    #[test]
    fn test_fragment_is_appended_on_close() {
        let mut buf = Buffer::new();
        buf.push_str("a");
        buf.open_fragment();
        buf.push_str("b");
        buf.close_fragment(Some(&Upper));
        buf.push_str("c");
        assert_eq!(buf.into_string(), "aBc");
    }

    #[test]
    fn test_nested_fragments() {
        let mut buf = Buffer::new();
        buf.open_fragment();
        buf.push_str("x");
        buf.open_fragment();
        buf.push_str("y");
        buf.close_fragment(None);
        buf.close_fragment(Some(&Upper));
        assert_eq!(buf.into_string(), "XY");
    }

    #[test]
    fn test_newline_tracks_last_byte_through_fragments() {
        let mut buf = Buffer::new();
        buf.newline();
        buf.push_str("a\n");
        buf.open_fragment();
        buf.newline();
        buf.push_str("b");
        buf.newline();
        assert_eq!(buf.into_string(), "a\nb\n");
    }

    #[test]
    fn test_close_without_fragment_is_noop() {
        let mut buf = Buffer::new();
        buf.push_str("a");
        buf.close_fragment(None);
        assert_eq!(buf.into_string(), "a");
    }
}
