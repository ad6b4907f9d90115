//! Character-level helpers: whitespace tokenization, escaping and the final
//! clean-up pass applied to every derived artifact.

use std::sync::LazyLock;

use regex::Regex;

/// Three or more newlines with only whitespace between them.
#[allow(clippy::expect_used)]
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid regex"));

/// Whitespace that separates words.
///
/// Non-breaking spaces are part of the word they appear in.
pub fn is_break_whitespace(c: char) -> bool {
    c.is_whitespace() && !matches!(c, '\u{00A0}' | '\u{2007}' | '\u{202F}')
}

/// Split text into words on breaking whitespace.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_break_whitespace).filter(|word| !word.is_empty())
}

/// Replace typographic quotes with their ASCII equivalents.
pub fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Final clean-up of a derived artifact.
///
/// Normalizes quotes and collapses every run of three or more newlines
/// (whitespace between them included) to a single blank line.
///
/// # Examples
/// ```
/// use spdx_license_xml::text::fix_up_text;
///
/// assert_eq!(fix_up_text("a\n\n\n\nb"), "a\n\nb");
/// assert_eq!(fix_up_text("\u{201C}x\u{201D}"), "\"x\"");
/// ```
pub fn fix_up_text(text: &str) -> String {
    let quoted = normalize_quotes(text);
    BLANK_LINE_RUN.replace_all(&quoted, "\n\n").into_owned()
}

/// Escape text for inclusion in XML or HTML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
