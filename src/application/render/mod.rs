//! Exam-content rendering.
//!
//! The pipeline is pure apart from the shared cache: it accepts question text,
//! produces deterministic HTML, and reports content problems as records on the
//! result instead of failing the call.

mod diagnostics;
mod service;
mod types;

pub use diagnostics::{ErrorCollector, ErrorKind, ErrorRecord, Severity};
pub use service::{
    CHOICE_TOKEN, Ceiling, ContentRenderer, DirectiveProcessor, FILL_TOKEN, KatexEngine,
    MACRO_ALIASES, MarkdownTransformer, MathEngine, MathEngineError, MathLimits,
    MathSpanRenderer, NumberingPolicy, PART_TOKEN, PREVIEW_MAX_CHARS, PREVIEW_TRUNCATION_MARKER,
    RenderConfigError, SUBPART_TOKEN, TypesetOptions, configure_render_cache, count_directives,
    count_formulas, render, render_service, to_roman,
};
pub use types::{
    CacheOptions, ErrorHandling, RenderConfig, RenderFeatures, RenderMetadata, RenderMode,
    RenderResult, RenderService,
};
