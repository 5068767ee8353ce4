//! Exam-question directives.
//!
//! | token      | output                                   |
//! |------------|------------------------------------------|
//! | `\choice`  | bracketed blank for a multiple-choice answer |
//! | `\fillin`  | underlined blank for fill-in answers     |
//! | `\subq`    | numbered sub-question `(1)`, `(2)`, ...  |
//! | `\subsubq` | sub-sub-question `i.`, `ii.`, ...        |
//!
//! A token only counts when it is outside math spans and not followed by an
//! ASCII letter. Sub-question scanning is flat: the text is split at every
//! `\subq`/`\subsubq`, and each directive's body runs up to the next marker of
//! either kind (or the end of the text). A `\subq` cannot contain another
//! `\subq`; nesting is not supported.
//!
//! Tokens inside math are hidden, so a bare `$` used as a currency sign pairs
//! with the next `$` and swallows any directive in between. Write it as `\$`.

use super::math::find_math_spans;
use crate::util::html::strip_tags;

pub const CHOICE_TOKEN: &str = "\\choice";
pub const FILL_TOKEN: &str = "\\fillin";
pub const PART_TOKEN: &str = "\\subq";
pub const SUBPART_TOKEN: &str = "\\subsubq";

const CHOICE_HTML: &str = "<span class=\"exam-choice\">(&emsp;&emsp;)</span>";
const FILL_HTML: &str = "<span class=\"exam-fill\">________</span>";

const PART_LABEL: &str = "sub-part";
const SUBPART_LABEL: &str = "sub-sub-part";

/// How sub-question labels are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingPolicy {
    /// `(1)`, `(2)`, ... for parts and `i.`, `ii.`, ... for subparts.
    Sequential,
    /// Fixed generic labels, no counting. Used by lightweight and preview renders.
    Simplified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Choice,
    Fill,
    Part,
    Subpart,
}

impl Marker {
    const ALL: [Marker; 4] = [Marker::Subpart, Marker::Part, Marker::Choice, Marker::Fill];

    fn token(self) -> &'static str {
        match self {
            Marker::Choice => CHOICE_TOKEN,
            Marker::Fill => FILL_TOKEN,
            Marker::Part => PART_TOKEN,
            Marker::Subpart => SUBPART_TOKEN,
        }
    }

    fn is_structural(self) -> bool {
        matches!(self, Marker::Part | Marker::Subpart)
    }
}

#[derive(Debug, Default)]
struct Counters {
    part: usize,
    subpart: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectiveProcessor {
    policy: NumberingPolicy,
}

impl DirectiveProcessor {
    pub fn new(policy: NumberingPolicy) -> Self {
        Self { policy }
    }

    /// Expand every directive in `text`. Counters start fresh on each call.
    pub fn process(&self, text: &str) -> String {
        let structured = self.expand_structural(text);
        expand_blanks(&structured)
    }

    fn expand_structural(&self, text: &str) -> String {
        let markers: Vec<(usize, Marker)> = scan_markers(text)
            .into_iter()
            .filter(|(_, marker)| marker.is_structural())
            .collect();

        let Some(&(first, _)) = markers.first() else {
            return text.to_owned();
        };

        let mut output = String::with_capacity(text.len() + markers.len() * 64);
        output.push_str(&text[..first]);

        let mut counters = Counters::default();
        for (index, &(position, marker)) in markers.iter().enumerate() {
            let body_start = position + marker.token().len();
            let body_end = markers
                .get(index + 1)
                .map_or(text.len(), |&(next, _)| next);
            output.push_str(&self.wrap(marker, &text[body_start..body_end], &mut counters));
        }

        output
    }

    fn wrap(&self, marker: Marker, body: &str, counters: &mut Counters) -> String {
        let cleaned = strip_tags_outside_math(body);
        let body = cleaned.trim();

        let (class, label) = if marker == Marker::Part {
            let label = match self.policy {
                NumberingPolicy::Sequential => {
                    counters.part += 1;
                    format!("({})", counters.part)
                }
                NumberingPolicy::Simplified => PART_LABEL.to_string(),
            };
            ("exam-part", label)
        } else {
            let label = match self.policy {
                NumberingPolicy::Sequential => {
                    counters.subpart += 1;
                    format!("{}.", to_roman(counters.subpart))
                }
                NumberingPolicy::Simplified => SUBPART_LABEL.to_string(),
            };
            ("exam-subpart", label)
        };

        format!("<div class=\"{class}\"><span class=\"{class}-label\">{label}</span> {body}</div>")
    }
}

/// Bodies may already hold markup from an earlier render pass; tags are
/// dropped, math spans are kept verbatim.
fn strip_tags_outside_math(body: &str) -> String {
    let mut output = String::with_capacity(body.len());
    let mut cursor = 0;
    for span in find_math_spans(body) {
        output.push_str(&strip_tags(&body[cursor..span.start]));
        output.push_str(&body[span.start..span.end]);
        cursor = span.end;
    }
    output.push_str(&strip_tags(&body[cursor..]));
    output
}

fn expand_blanks(text: &str) -> String {
    let markers = scan_markers(text);
    if markers.is_empty() {
        return text.to_owned();
    }

    let mut output = String::with_capacity(text.len() + markers.len() * 48);
    let mut cursor = 0;
    for (position, marker) in markers {
        let html = match marker {
            Marker::Choice => CHOICE_HTML,
            Marker::Fill => FILL_HTML,
            Marker::Part | Marker::Subpart => continue,
        };
        output.push_str(&text[cursor..position]);
        output.push_str(html);
        cursor = position + marker.token().len();
    }
    output.push_str(&text[cursor..]);
    output
}

/// Directive tokens outside math spans, in document order.
fn scan_markers(text: &str) -> Vec<(usize, Marker)> {
    let spans = find_math_spans(text);
    text.match_indices('\\')
        .filter(|(position, _)| !spans.iter().any(|span| span.contains(*position)))
        .filter_map(|(position, _)| marker_at(text, position).map(|marker| (position, marker)))
        .collect()
}

fn marker_at(text: &str, position: usize) -> Option<Marker> {
    let rest = &text[position..];
    Marker::ALL.into_iter().find(|marker| {
        let token = marker.token();
        rest.starts_with(token)
            && !rest[token.len()..]
                .chars()
                .next()
                .is_some_and(|ch| ch.is_ascii_alphabetic())
    })
}

/// Number of directive tokens of any kind in `text`.
pub fn count_directives(text: &str) -> usize {
    scan_markers(text).len()
}

/// Lowercase Roman numeral for `value`. Zero yields an empty string.
pub fn to_roman(mut value: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];

    let mut numeral = String::new();
    for (amount, symbol) in NUMERALS {
        while value >= amount {
            numeral.push_str(symbol);
            value -= amount;
        }
    }
    numeral
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential(text: &str) -> String {
        DirectiveProcessor::new(NumberingPolicy::Sequential).process(text)
    }

    fn simplified(text: &str) -> String {
        DirectiveProcessor::new(NumberingPolicy::Simplified).process(text)
    }

    #[test]
    fn parts_are_numbered_in_order() {
        assert_eq!(
            sequential("\\subq A \\subq B"),
            "<div class=\"exam-part\"><span class=\"exam-part-label\">(1)</span> A</div>\
             <div class=\"exam-part\"><span class=\"exam-part-label\">(2)</span> B</div>"
        );
    }

    #[test]
    fn subparts_use_roman_numerals() {
        let html = sequential(&"\\subsubq x ".repeat(6));
        let labels: Vec<&str> = html
            .split("<span class=\"exam-subpart-label\">")
            .skip(1)
            .filter_map(|fragment| fragment.split('<').next())
            .collect();
        assert_eq!(labels, vec!["i.", "ii.", "iii.", "iv.", "v.", "vi."]);
    }

    #[test]
    fn body_ends_at_next_marker_of_either_kind() {
        let html = sequential("Intro \\subq Q1 \\subsubq a \\subsubq b \\subq Q2");
        assert_eq!(
            html,
            "Intro <div class=\"exam-part\"><span class=\"exam-part-label\">(1)</span> Q1</div>\
             <div class=\"exam-subpart\"><span class=\"exam-subpart-label\">i.</span> a</div>\
             <div class=\"exam-subpart\"><span class=\"exam-subpart-label\">ii.</span> b</div>\
             <div class=\"exam-part\"><span class=\"exam-part-label\">(2)</span> Q2</div>"
        );
    }

    #[test]
    fn last_directive_consumes_remaining_text() {
        let html = sequential("\\subq first line\nsecond line");
        assert!(html.ends_with("(1)</span> first line\nsecond line</div>"));
    }

    #[test]
    fn markers_inside_math_are_ignored() {
        let html = sequential("\\subq Show $\\subq x$ holds \\subq Done");
        assert!(html.contains("(1)</span> Show $\\subq x$ holds</div>"));
        assert!(html.contains("(2)</span> Done</div>"));
        assert_eq!(count_directives("\\subq Show $\\subq x$ holds"), 1);
    }

    #[test]
    fn escaped_dollar_does_not_open_math() {
        let text = "\\subq Apples cost \\$5 each. \\subq Find $x$.";
        assert_eq!(count_directives(text), 2);

        let html = sequential(text);
        assert!(html.contains("(1)</span> Apples cost \\$5 each.</div>"), "{html}");
        assert!(html.contains("(2)</span> Find $x$.</div>"), "{html}");
    }

    #[test]
    fn token_followed_by_letters_is_not_a_marker() {
        assert_eq!(sequential("\\subqx and \\choices"), "\\subqx and \\choices");
    }

    #[test]
    fn simplified_policy_uses_generic_labels() {
        let html = simplified("\\subq A \\subsubq b \\subq C");
        assert_eq!(html.matches(">sub-part</span>").count(), 2);
        assert_eq!(html.matches(">sub-sub-part</span>").count(), 1);
        assert!(!html.contains("(1)"));
    }

    #[test]
    fn blanks_are_replaced_without_numbering() {
        assert_eq!(
            sequential("Pick \\choice then write \\fillin."),
            format!("Pick {CHOICE_HTML} then write {FILL_HTML}.")
        );
    }

    #[test]
    fn blanks_inside_parts_survive_body_cleanup() {
        let html = sequential("\\subq Answer: \\choice");
        assert_eq!(
            html,
            format!(
                "<div class=\"exam-part\"><span class=\"exam-part-label\">(1)</span> Answer: {CHOICE_HTML}</div>"
            )
        );
    }

    #[test]
    fn tags_in_bodies_are_stripped() {
        assert_eq!(
            sequential("\\subq <strong>Bold</strong> claim"),
            "<div class=\"exam-part\"><span class=\"exam-part-label\">(1)</span> Bold claim</div>"
        );
    }

    #[test]
    fn math_in_bodies_survives_tag_stripping() {
        let html = sequential("\\subq Compare $a<b$ with $c>d$ <em>now</em>");
        assert!(
            html.ends_with("(1)</span> Compare $a<b$ with $c>d$ now</div>"),
            "{html}"
        );
    }

    #[test]
    fn counters_reset_between_calls() {
        let processor = DirectiveProcessor::new(NumberingPolicy::Sequential);
        assert!(processor.process("\\subq A").contains("(1)"));
        assert!(processor.process("\\subq B").contains("(1)"));
    }

    #[test]
    fn text_without_directives_is_unchanged() {
        assert_eq!(sequential("plain $x$ text"), "plain $x$ text");
    }

    #[test]
    fn counts_every_directive_kind() {
        assert_eq!(count_directives("\\subq a \\subsubq b \\choice \\fillin"), 4);
        assert_eq!(count_directives("none here"), 0);
    }

    #[test]
    fn roman_numerals() {
        let cases = [
            (1, "i"),
            (4, "iv"),
            (9, "ix"),
            (14, "xiv"),
            (40, "xl"),
            (90, "xc"),
            (400, "cd"),
            (1994, "mcmxciv"),
        ];
        for (value, expected) in cases {
            assert_eq!(to_roman(value), expected, "roman numeral for {value}");
        }
        assert_eq!(to_roman(0), "");
    }
}
