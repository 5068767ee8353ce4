//! Math span detection and typesetting.
//!
//! Block spans (`$$…$$`) are located before inline spans (`$…$`) so that a
//! display delimiter is never read as two inline delimiters. Engine failures
//! never escape this module: each rejected formula becomes a visible inline
//! marker plus an error record, and the rest of the document still renders.

use katex::{OptsBuilder, OutputType};
use thiserror::Error;
use tracing::warn;

use crate::application::render::diagnostics::{ErrorCollector, ErrorKind};
use crate::util::html::escape_html;

/// Convenience aliases available inside math spans only.
pub const MACRO_ALIASES: &[(&str, &str)] = &[
    ("\\blank", "\\underline{\\hspace{3em}}"),
    ("\\bracket", "\\left(\\quad\\right)"),
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MathEngineError {
    #[error("{message}")]
    Syntax { message: String },
    #[error("invalid typesetting options: {message}")]
    Options { message: String },
}

/// Options handed to the typesetting engine for one formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypesetOptions {
    pub display_mode: bool,
    pub max_size: f64,
    pub max_expand: i32,
    pub macros: &'static [(&'static str, &'static str)],
}

/// External typesetting engine: formula in, HTML out, or a syntax error.
pub trait MathEngine: Send + Sync {
    fn typeset(&self, formula: &str, options: &TypesetOptions) -> Result<String, MathEngineError>;
}

/// KaTeX-backed engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct KatexEngine;

impl MathEngine for KatexEngine {
    fn typeset(&self, formula: &str, options: &TypesetOptions) -> Result<String, MathEngineError> {
        let mut builder = OptsBuilder::default();
        builder.display_mode(options.display_mode);
        builder.output_type(OutputType::Html);
        builder.throw_on_error(true);
        builder.max_size(Some(options.max_size));
        builder.max_expand(Some(options.max_expand));

        let opts = builder.build().map_err(|err| MathEngineError::Options {
            message: err.to_string(),
        })?;

        let formula = expand_aliases(formula, options.macros);
        katex::render_with_opts(&formula, opts).map_err(|err| MathEngineError::Syntax {
            message: err.to_string(),
        })
    }
}

/// Replace each alias control word with its expansion. An alias only matches
/// when it is not followed by another ASCII letter, so `\blanks` is left alone.
fn expand_aliases(formula: &str, aliases: &[(&str, &str)]) -> String {
    let mut expanded = formula.to_owned();
    for (name, expansion) in aliases {
        let mut output = String::with_capacity(expanded.len());
        let mut rest = expanded.as_str();
        while let Some(found) = rest.find(name) {
            let after = &rest[found + name.len()..];
            output.push_str(&rest[..found]);
            if after.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic()) {
                output.push_str(name);
            } else {
                output.push_str(expansion);
            }
            rest = after;
        }
        output.push_str(rest);
        expanded = output;
    }
    expanded
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ceiling {
    pub max_size: f64,
    pub max_expand: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MathLimits {
    pub block: Ceiling,
    pub inline: Ceiling,
}

impl MathLimits {
    /// Ceilings for full renders.
    pub const STANDARD: Self = Self {
        block: Ceiling {
            max_size: 500.0,
            max_expand: 1000,
        },
        inline: Ceiling {
            max_size: 200.0,
            max_expand: 500,
        },
    };

    /// Ceilings for lightweight and preview renders.
    pub const TIGHT: Self = Self {
        block: Ceiling {
            max_size: 100.0,
            max_expand: 200,
        },
        inline: Ceiling {
            max_size: 50.0,
            max_expand: 100,
        },
    };

    fn options(&self, display_mode: bool) -> TypesetOptions {
        let ceiling = if display_mode { self.block } else { self.inline };
        TypesetOptions {
            display_mode,
            max_size: ceiling.max_size,
            max_expand: ceiling.max_expand,
            macros: MACRO_ALIASES,
        }
    }
}

/// Byte range of a math span, delimiters included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MathSpan {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) display: bool,
}

impl MathSpan {
    fn delimiter_len(&self) -> usize {
        if self.display { 2 } else { 1 }
    }

    pub(crate) fn formula<'a>(&self, text: &'a str) -> &'a str {
        let delimiter = self.delimiter_len();
        &text[self.start + delimiter..self.end - delimiter]
    }

    pub(crate) fn contains(&self, position: usize) -> bool {
        (self.start..self.end).contains(&position)
    }
}

/// All math spans in `text`, ordered by position.
pub(crate) fn find_math_spans(text: &str) -> Vec<MathSpan> {
    let mut spans = find_block_spans(text);
    let inline = find_inline_spans(text, &spans);
    spans.extend(inline);
    spans.sort_by_key(|span| span.start);
    spans
}

/// Number of math spans in `text`.
pub fn count_formulas(text: &str) -> usize {
    find_math_spans(text).len()
}

fn find_block_spans(text: &str) -> Vec<MathSpan> {
    let mut spans = Vec::new();
    let mut offset = 0;

    while let Some(open) = find_unescaped(text, offset, "$$") {
        let Some(close) = find_unescaped(text, open + 2, "$$") else {
            break;
        };
        spans.push(MathSpan {
            start: open,
            end: close + 2,
            display: true,
        });
        offset = close + 2;
    }

    spans
}

fn find_unescaped(text: &str, from: usize, pattern: &str) -> Option<usize> {
    let mut offset = from;
    while let Some(relative) = text.get(offset..)?.find(pattern) {
        let position = offset + relative;
        if position > 0 && text.as_bytes()[position - 1] == b'\\' {
            offset = position + 1;
            continue;
        }
        return Some(position);
    }
    None
}

/// Inline spans in the gaps between block spans. An inline span never crosses
/// a blank line, and an unmatched `$` stays literal text.
fn find_inline_spans(text: &str, blocks: &[MathSpan]) -> Vec<MathSpan> {
    let mut spans = Vec::new();
    let mut region_start = 0;

    for block in blocks {
        scan_inline_region(text, region_start, block.start, &mut spans);
        region_start = block.end;
    }
    scan_inline_region(text, region_start, text.len(), &mut spans);

    spans
}

fn scan_inline_region(text: &str, start: usize, end: usize, spans: &mut Vec<MathSpan>) {
    let bytes = text.as_bytes();
    let mut open: Option<usize> = None;
    let mut index = start;

    while index < end {
        match bytes[index] {
            b'\\' => {
                index += 2;
            }
            b'$' => {
                let doubled = index + 1 < end && bytes[index + 1] == b'$';
                match open {
                    None if doubled => {
                        // unmatched display delimiter
                        index += 2;
                    }
                    None => {
                        open = Some(index);
                        index += 1;
                    }
                    Some(opened) => {
                        if index > opened + 1 {
                            spans.push(MathSpan {
                                start: opened,
                                end: index + 1,
                                display: false,
                            });
                        }
                        open = None;
                        index += 1;
                    }
                }
            }
            b'\n' if open.is_some() && index + 1 < end && bytes[index + 1] == b'\n' => {
                open = None;
                index += 2;
            }
            _ => index += 1,
        }
    }
}

/// Renders every math span in a text through a [`MathEngine`].
pub struct MathSpanRenderer<'a> {
    engine: &'a dyn MathEngine,
    limits: MathLimits,
}

impl<'a> MathSpanRenderer<'a> {
    pub fn new(engine: &'a dyn MathEngine, limits: MathLimits) -> Self {
        Self { engine, limits }
    }

    pub fn render(&self, text: &str, collector: &mut ErrorCollector) -> String {
        let blocks = find_block_spans(text);
        let inlines = find_inline_spans(text, &blocks);
        if blocks.is_empty() && inlines.is_empty() {
            return text.to_owned();
        }

        let mut rendered: Vec<(MathSpan, String)> = blocks
            .into_iter()
            .chain(inlines)
            .map(|span| {
                let html = self.render_span(text, span, collector);
                (span, html)
            })
            .collect();
        rendered.sort_by_key(|(span, _)| span.start);

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        for (span, html) in rendered {
            output.push_str(&text[cursor..span.start]);
            output.push_str(&html);
            cursor = span.end;
        }
        output.push_str(&text[cursor..]);
        output
    }

    fn render_span(&self, text: &str, span: MathSpan, collector: &mut ErrorCollector) -> String {
        let formula = span.formula(text);
        let options = self.limits.options(span.display);

        match self.engine.typeset(formula, &options) {
            Ok(html) => html,
            Err(err) => {
                warn!(
                    target: "examark::math",
                    formula,
                    display = span.display,
                    position = span.start,
                    error = %err,
                    "formula rejected by math engine"
                );
                collector.add_error_at(
                    ErrorKind::Math,
                    format!("math rendering failed: {err}"),
                    formula,
                    span.start,
                );
                error_marker(formula, span.display, &err)
            }
        }
    }
}

fn error_marker(formula: &str, display: bool, error: &MathEngineError) -> String {
    let title = escape_html(&error.to_string());
    let source = escape_html(formula);
    if display {
        format!("<div class=\"math-error\" title=\"{title}\">$${source}$$</div>")
    } else {
        format!("<span class=\"math-error\" title=\"{title}\">${source}$</span>")
    }
}
