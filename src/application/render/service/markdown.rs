//! Lightweight markdown dialect used by full renders.
//!
//! This is an ordered list of independent regex rewrites, not a parser. Each
//! rule runs once over the output of the previous one, so delimiters that span
//! another rule's output are not handled. Order matters: bold must run before
//! italic because both use `*`, and inline rules run before line rules.
//!
//! Math spans are masked while the rules run, so formulas reach the math stage
//! byte for byte and never count as markdown.

use once_cell::sync::Lazy;
use regex::Regex;

use super::math::find_math_spans;

// Private-use code points around the index of a masked math span.
const MASK_OPEN: char = '\u{E000}';
const MASK_CLOSE: char = '\u{E001}';

struct Rule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("markdown rule `{name}` must compile: {err}"));
        Self {
            name,
            pattern,
            replacement,
        }
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new("bold", r"\*\*([^*\n]+?)\*\*", "<strong>${1}</strong>"),
        Rule::new("italic", r"\*([^*\n]+)\*", "<em>${1}</em>"),
        Rule::new("code", r"`([^`\n]+)`", "<code>${1}</code>"),
        Rule::new("strikethrough", r"~~([^~\n]+?)~~", "<del>${1}</del>"),
        Rule::new("heading3", r"(?m)^### (.+)$", "<h3>${1}</h3>"),
        Rule::new("heading2", r"(?m)^## (.+)$", "<h2>${1}</h2>"),
        Rule::new("heading1", r"(?m)^# (.+)$", "<h1>${1}</h1>"),
        Rule::new("unordered_item", r"(?m)^[-*+] (.+)$", "<li>${1}</li>"),
        Rule::new("ordered_item", r"(?m)^(\d+)\. (.+)$", "<li value=\"${1}\">${2}</li>"),
    ]
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownTransformer;

impl MarkdownTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(&self, text: &str) -> String {
        apply_rules(text).0
    }

    /// Number of substitutions the rule chain performs on `text`.
    pub fn count_elements(&self, text: &str) -> usize {
        apply_rules(text).1
    }
}

fn apply_rules(text: &str) -> (String, usize) {
    let (mut output, formulas) = mask_math(text);
    let mut total = 0;

    for rule in RULES.iter() {
        let matches = rule.pattern.find_iter(&output).count();
        if matches == 0 {
            continue;
        }
        tracing::trace!(
            target: "examark::render::markdown",
            rule = rule.name,
            matches,
            "applying markdown rule"
        );
        output = rule
            .pattern
            .replace_all(&output, rule.replacement)
            .into_owned();
        total += matches;
    }

    (unmask_math(&output, &formulas), total)
}

fn mask_math(text: &str) -> (String, Vec<&str>) {
    let spans = find_math_spans(text);
    if spans.is_empty() {
        return (text.to_owned(), Vec::new());
    }

    let mut masked = String::with_capacity(text.len());
    let mut formulas = Vec::with_capacity(spans.len());
    let mut cursor = 0;
    for span in spans {
        masked.push_str(&text[cursor..span.start]);
        masked.push(MASK_OPEN);
        masked.push_str(&formulas.len().to_string());
        masked.push(MASK_CLOSE);
        formulas.push(&text[span.start..span.end]);
        cursor = span.end;
    }
    masked.push_str(&text[cursor..]);
    (masked, formulas)
}

fn unmask_math(text: &str, formulas: &[&str]) -> String {
    if formulas.is_empty() {
        return text.to_owned();
    }

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(MASK_OPEN) {
        output.push_str(&rest[..open]);
        let after = &rest[open + MASK_OPEN.len_utf8()..];
        let restored = after.find(MASK_CLOSE).and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            formulas.get(index).map(|formula| (*formula, close))
        });
        match restored {
            Some((formula, close)) => {
                output.push_str(formula);
                rest = &after[close + MASK_CLOSE.len_utf8()..];
            }
            None => {
                output.push(MASK_OPEN);
                rest = after;
            }
        }
    }
    output.push_str(rest);
    output
}
