//! Small HTML text helpers shared by the render stages.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^<>]*>").expect("tag pattern must compile"));

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Remove anything that looks like an HTML tag, leaving the text between tags.
///
/// A lone `<` (as in `a < b`) is kept because the pattern requires a closing `>`
/// with no intervening `<`.
pub fn strip_tags(value: &str) -> String {
    TAG_PATTERN.replace_all(value, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn strips_tags_but_keeps_text() {
        assert_eq!(
            strip_tags("<strong>bold</strong> and <em>more</em>"),
            "bold and more"
        );
    }

    #[test]
    fn keeps_lone_comparison_operator() {
        assert_eq!(strip_tags("a < b holds"), "a < b holds");
    }
}
