//! HTML escaping helpers.

/// Escape `&`, `<`, `>` and `"` for use in element content and attribute values.
///
/// # Examples
///
/// ```
/// use caret_renderer::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text shown inside block references and `data-title` attributes.
///
/// Unlike [`escape_html`] this leaves `&` alone so entities already present survive, and
/// also escapes the single quote.
#[must_use]
pub fn escape_ref_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Cut `s` to at most `max` characters.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_html_leaves_plain_text() {
        assert_eq!(escape_html("plain ‸ text"), "plain ‸ text");
    }

    #[test]
    fn test_escape_html_is_not_idempotent() {
        assert_eq!(escape_html(&escape_html("&")), "&amp;amp;");
    }

    #[test]
    fn test_escape_ref_text() {
        assert_eq!(escape_ref_text(r#"<b>"it's" &amp;"#), "&lt;b&gt;&quot;it&apos;s&quot; &amp;");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("中文字符", 2), "中文");
        assert_eq!(truncate_chars("ab", 24), "ab");
    }
}
