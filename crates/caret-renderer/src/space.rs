//! Spacing between CJK and Latin runs.

use caret_ast::CARET;

/// Insert a space at every boundary between a CJK character and a Latin letter or digit.
///
/// A Han character directly followed by `ing` is left alone, as is a digit followed by the
/// emoji variation selector.
///
/// # Examples
///
/// ```
/// use caret_renderer::space::space_text;
///
/// assert_eq!(space_text("使用Rust编写"), "使用 Rust 编写");
/// assert_eq!(space_text("打码ing"), "打码ing");
/// ```
#[must_use]
pub fn space_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_han(c) && chars.get(i + 1..i + 4) == Some(&['i', 'n', 'g'][..]) {
            push_spaced(&mut out, c);
            out.push_str("ing");
            i += 4;
            continue;
        }
        push_spaced(&mut out, c);
        i += 1;
    }
    out
}

fn push_spaced(out: &mut String, next: char) {
    if let Some(current) = out.chars().next_back() {
        let emoji_digit = ('1'..='9').contains(&current) && next == '\u{fe0f}';
        if !emoji_digit && allow_space(current, next) {
            out.push(' ');
        }
    }
    out.push(next);
}

/// Whether a space belongs between `current` and `next`.
///
/// True only when exactly one side is CJK and neither side is whitespace, the caret, a
/// non-printable character, or punctuation adjacent to the CJK side.
#[must_use]
pub fn allow_space(current: char, next: char) -> bool {
    let caret = CARET.chars().next();
    if current.is_whitespace()
        || next.is_whitespace()
        || Some(current) == caret
        || Some(next) == caret
        || !is_printable(current)
        || !is_printable(next)
    {
        return false;
    }
    let current_cjk = is_cjk(current);
    let next_cjk = is_cjk(next);
    if current_cjk && is_spacing_punct(next) {
        return false;
    }
    if next_cjk && is_spacing_punct(current) {
        return false;
    }
    current_cjk != next_cjk
}

fn is_spacing_punct(c: char) -> bool {
    c != '%' && c != '@' && (is_punct(c) || matches!(c, '~' | '=' | '#'))
}

fn is_punct(c: char) -> bool {
    matches!(
        c,
        '!' | '"' | '#' | '%' | '&' | '\'' | '(' | ')' | '*' | ',' | '-' | '.' | '/' | ':' | ';'
            | '?' | '@' | '[' | '\\' | ']' | '_' | '{' | '}'
    ) || matches!(
        c as u32,
        0x00A1 | 0x00A7 | 0x00AB | 0x00B6 | 0x00B7 | 0x00BB | 0x00BF
            | 0x2010..=0x2027
            | 0x2030..=0x205E
            | 0x3001..=0x3003
            | 0x3008..=0x3011
            | 0x3014..=0x301F
            | 0x30FB
            | 0xFE10..=0xFE19
            | 0xFE30..=0xFE4F
            | 0xFF01..=0xFF03
            | 0xFF05..=0xFF0A
            | 0xFF0C..=0xFF0F
            | 0xFF1A..=0xFF1B
            | 0xFF1F..=0xFF20
            | 0xFF3B..=0xFF3D
            | 0xFF3F
            | 0xFF5B
            | 0xFF5D
            | 0xFF5F..=0xFF65
    )
}

fn is_printable(c: char) -> bool {
    !c.is_control()
        && !matches!(
            c as u32,
            0x200B..=0x200F | 0x2028..=0x202E | 0x2060..=0x206F | 0xFEFF
        )
}

fn is_han(c: char) -> bool {
    matches!(
        c as u32,
        0x2E80..=0x2E99
            | 0x2E9B..=0x2EF3
            | 0x2F00..=0x2FD5
            | 0x3005
            | 0x3007
            | 0x3021..=0x3029
            | 0x3038..=0x303B
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xF900..=0xFAFF
            | 0x20000..=0x323AF
    )
}

/// Han, Hiragana, Katakana, Hangul and CJK modifier letters.
pub(crate) fn is_cjk(c: char) -> bool {
    is_han(c)
        || matches!(
            c as u32,
            0x02B0..=0x02C1
                | 0x3031..=0x3035
                | 0x3041..=0x3096
                | 0x309D..=0x309F
                | 0x30A1..=0x30FA
                | 0x30FC..=0x30FF
                | 0x31F0..=0x31FF
                | 0xFF66..=0xFF9F
                | 0x1100..=0x11FF
                | 0x3131..=0x318E
                | 0xA960..=0xA97C
                | 0xAC00..=0xD7A3
                | 0xD7B0..=0xD7FB
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_space_text_between_runs() {
        assert_eq!(space_text("中文English中文"), "中文 English 中文");
        assert_eq!(space_text("版本2更新"), "版本 2 更新");
    }

    #[test]
    fn test_space_text_keeps_existing_spaces() {
        assert_eq!(space_text("中文 English"), "中文 English");
    }

    #[test]
    fn test_no_space_around_punctuation() {
        assert_eq!(space_text("中文，English"), "中文，English");
        assert_eq!(space_text("中文#tag"), "中文#tag");
        assert_eq!(space_text("100%中文"), "100% 中文");
    }

    #[test]
    fn test_no_space_next_to_caret() {
        assert_eq!(space_text("中‸a"), "中‸a");
    }

    #[test]
    fn test_kana_and_hangul_are_cjk() {
        assert!(allow_space('か', 'a'));
        assert!(allow_space('한', '1'));
        assert!(!allow_space('a', 'b'));
        assert!(!allow_space('中', '文'));
    }
}
