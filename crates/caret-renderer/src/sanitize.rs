//! Sanitization of untrusted HTML fragments.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Cleans an HTML fragment before it reaches the output.
pub trait Sanitizer {
    /// Return a safe version of `html`.
    fn sanitize(&self, html: &str) -> String;
}

/// Elements removed together with their content.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "noembed", "noframes",
    "noscript", "title",
];

static DROPPED_ELEMENT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DROPPED_ELEMENTS
        .iter()
        .map(|name| Regex::new(&format!(r"(?is)<{name}\b[^>]*>.*?</{name}\s*>")).unwrap())
        .collect()
});

static STRAY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)</?(?:{}|embed)\b[^>]*>",
        DROPPED_ELEMENTS.join("|")
    ))
    .unwrap()
});

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z][a-zA-Z0-9-]*(?:[\s/][^>]*)?>").unwrap());

// `/` separates attributes as well as whitespace does: `<svg/onload=...>`.
static EVENT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
});

static URL_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)([\s/](?:href|src|data|action|formaction|xlink:href)\s*=\s*)("[^"]*"|'[^']*'|[^\s>]+)"#,
    )
    .unwrap()
});

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&#(?:x([0-9a-f]+)|([0-9]+));?").unwrap());

static SCRIPT_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:javascript|vbscript):").unwrap());

/// Decodes character references and drops whitespace and control characters, the way a
/// browser reads a URL attribute before looking at its scheme.
fn normalize_url(value: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(value, |caps: &Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32).map(String::from).unwrap_or_default()
    });
    html_escape::decode_html_entities(&numeric)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect()
}

/// Whether a link destination runs script when followed.
pub fn is_script_url(dest: &str) -> bool {
    SCRIPT_SCHEME_RE.is_match(&normalize_url(dest))
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

/// Regex based sanitizer.
///
/// Drops scripting and framing elements with their content, `<embed>` tags, comments and
/// `on*` event handler attributes, and empties `javascript:`/`vbscript:` URLs in URL
/// attributes. Schemes are checked after character references are decoded. Everything
/// else passes through.
///
/// # Examples
///
/// ```
/// use caret_renderer::{RegexSanitizer, Sanitizer};
///
/// let clean = RegexSanitizer.sanitize(r#"<p onclick="x()">hi<script>alert(1)</script></p>"#);
/// assert_eq!(clean, "<p>hi</p>");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexSanitizer;

impl Sanitizer for RegexSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let mut out = COMMENT_RE.replace_all(html, "").into_owned();
        for re in DROPPED_ELEMENT_RES.iter() {
            out = re.replace_all(&out, "").into_owned();
        }
        out = STRAY_TAG_RE.replace_all(&out, "").into_owned();
        OPEN_TAG_RE
            .replace_all(&out, |caps: &Captures<'_>| {
                let tag = EVENT_ATTR_RE.replace_all(&caps[0], "");
                URL_ATTR_RE
                    .replace_all(&tag, |attr: &Captures<'_>| {
                        if is_script_url(strip_quotes(&attr[2])) {
                            format!(r#"{}"""#, &attr[1])
                        } else {
                            attr[0].to_owned()
                        }
                    })
                    .into_owned()
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn clean(html: &str) -> String {
        RegexSanitizer.sanitize(html)
    }

    #[test]
    fn test_drops_script_with_content() {
        assert_eq!(clean("<div>a<SCRIPT type=\"x\">evil()</script>b</div>"), "<div>ab</div>");
    }

    #[test]
    fn test_drops_unclosed_script_tag() {
        assert_eq!(clean("<script src=x>"), "");
    }

    #[test]
    fn test_removes_event_handlers() {
        assert_eq!(
            clean(r#"<img src="a.png" onerror='alert(1)' alt="x" />"#),
            r#"<img src="a.png" alt="x" />"#
        );
    }

    #[test]
    fn test_neutralizes_script_urls() {
        assert_eq!(
            clean(r#"<a href=" javascript:alert(1)">x</a>"#),
            r#"<a href="">x</a>"#
        );
        assert_eq!(clean("<a href=vbscript:x>y</a>"), r#"<a href="">y</a>"#);
    }

    #[test]
    fn test_slash_separated_event_attr_removed() {
        assert_eq!(clean("<svg/onload=alert(1)>"), "<svg>");
        assert_eq!(clean(r#"<img src="a.png"/onerror="x()">"#), r#"<img src="a.png">"#);
    }

    #[test]
    fn test_entity_encoded_script_scheme_neutralized() {
        assert_eq!(
            clean(r#"<a href="&#106;avascript:alert(1)">x</a>"#),
            r#"<a href="">x</a>"#
        );
        assert_eq!(
            clean("<a href='java&#x09;script&#58;x()'>y</a>"),
            r#"<a href="">y</a>"#
        );
        assert_eq!(
            clean(r#"<a href="https://example.com/?a=1&amp;b=2">z</a>"#),
            r#"<a href="https://example.com/?a=1&amp;b=2">z</a>"#
        );
    }

    #[test]
    fn test_is_script_url() {
        assert!(is_script_url("javascript:alert(1)"));
        assert!(is_script_url("  VBScript:x"));
        assert!(is_script_url("&#x6A;ava\tscript:x"));
        assert!(!is_script_url("https://example.com/javascript:"));
    }

    #[test]
    fn test_keeps_text_that_looks_like_attributes() {
        assert_eq!(clean("<p>onload=1</p>"), "<p>onload=1</p>");
    }

    #[test]
    fn test_strips_comments_and_embed() {
        assert_eq!(clean("a<!-- x -->b<embed src=\"f.swf\">"), "ab");
    }
}
