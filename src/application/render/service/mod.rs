mod directives;
mod markdown;
mod math;

use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;
use tracing::debug;

use crate::application::render::diagnostics::{ErrorCollector, ErrorKind};
use crate::application::render::types::{
    ErrorHandling, RenderConfig, RenderFeatures, RenderMetadata, RenderMode, RenderResult,
    RenderService,
};
use crate::cache::{CacheConfig, CachedRender, RenderCache, cache_key};

pub use directives::{
    CHOICE_TOKEN, DirectiveProcessor, FILL_TOKEN, NumberingPolicy, PART_TOKEN, SUBPART_TOKEN,
    count_directives, to_roman,
};
pub use markdown::MarkdownTransformer;
pub use math::{
    Ceiling, KatexEngine, MACRO_ALIASES, MathEngine, MathEngineError, MathLimits,
    MathSpanRenderer, TypesetOptions, count_formulas,
};

/// Preview renders keep at most this many characters of the input.
pub const PREVIEW_MAX_CHARS: usize = 200;
/// Appended to a truncated preview.
pub const PREVIEW_TRUNCATION_MARKER: &str = "...";

/// Markdown, directive and math stages behind a shared render cache.
pub struct ContentRenderer {
    engine: Arc<dyn MathEngine>,
    cache: Arc<RenderCache>,
}

impl ContentRenderer {
    pub fn new(engine: Arc<dyn MathEngine>, cache: Arc<RenderCache>) -> Self {
        Self { engine, cache }
    }

    pub fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }

    fn compile(&self, content: &str, config: &RenderConfig, collector: &mut ErrorCollector) -> String {
        match config.mode {
            RenderMode::Full => self.compile_full(content, &config.features, collector),
            RenderMode::Lightweight => self.compile_compact(content, &config.features, collector),
            RenderMode::Preview => {
                let excerpt = truncate_for_preview(content, collector);
                self.compile_compact(&excerpt, &config.features, collector)
            }
        }
    }

    fn compile_full(
        &self,
        content: &str,
        features: &RenderFeatures,
        collector: &mut ErrorCollector,
    ) -> String {
        let mut text = content.to_owned();
        if features.markdown {
            text = MarkdownTransformer::new().transform(&text);
        }
        if features.question_syntax {
            text = DirectiveProcessor::new(NumberingPolicy::Sequential).process(&text);
        }
        MathSpanRenderer::new(self.engine.as_ref(), MathLimits::STANDARD).render(&text, collector)
    }

    fn compile_compact(
        &self,
        content: &str,
        features: &RenderFeatures,
        collector: &mut ErrorCollector,
    ) -> String {
        let text = if features.question_syntax {
            DirectiveProcessor::new(NumberingPolicy::Simplified).process(content)
        } else {
            content.to_owned()
        };
        MathSpanRenderer::new(self.engine.as_ref(), MathLimits::TIGHT).render(&text, collector)
    }
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new(
            Arc::new(KatexEngine),
            Arc::new(RenderCache::new(&active_cache_config())),
        )
    }
}

impl RenderService for ContentRenderer {
    fn render(&self, content: Option<&str>, config: &RenderConfig) -> RenderResult {
        let Some(content) = content.filter(|content| !content.is_empty()) else {
            return RenderResult::empty();
        };

        let metadata = collect_metadata(content, &config.features);
        let key = config
            .cache
            .enabled
            .then(|| cache_key(config, content));

        if let Some(key) = key.as_deref()
            && let Some(cached) = self.cache.lookup(key)
        {
            debug!(target: "examark::render", mode = %config.mode, key, "render cache hit");
            return RenderResult {
                html: cached.html,
                error: cached.error,
                warnings: cached.warnings,
                metadata,
            };
        }

        let mut collector = ErrorCollector::new();
        if config.error_handling == ErrorHandling::Strict {
            collector.add_info(
                ErrorKind::Markdown,
                "strict error handling is not supported; rendered leniently",
                "",
            );
        }

        let html = self.compile(content, config, &mut collector);

        debug!(
            target: "examark::render",
            mode = %config.mode,
            formulas = metadata.formula_count,
            errors = collector.error_count(),
            warnings = collector.warning_count(),
            cached = key.is_some(),
            "content rendered"
        );

        let error = collector.summary();
        let warnings = collector.warning_messages();

        if let Some(key) = key {
            let cached = CachedRender {
                html: html.clone(),
                error: error.clone(),
                warnings: warnings.clone(),
            };
            self.cache
                .set_bounded(key, cached, config.cache.max_entries);
        }

        RenderResult {
            html,
            error,
            warnings,
            metadata,
        }
    }
}

/// Counts over the untransformed input. Stage flags decide which counts are
/// taken; the mode does not.
fn collect_metadata(content: &str, features: &RenderFeatures) -> RenderMetadata {
    RenderMetadata {
        formula_count: count_formulas(content),
        question_directive_count: if features.question_syntax {
            count_directives(content)
        } else {
            0
        },
        markdown_element_count: if features.markdown {
            MarkdownTransformer::new().count_elements(content)
        } else {
            0
        },
    }
}

/// Keep the first [`PREVIEW_MAX_CHARS`] characters. May cut through a math
/// span or directive body.
fn truncate_for_preview(content: &str, collector: &mut ErrorCollector) -> String {
    let Some((cut, _)) = content.char_indices().nth(PREVIEW_MAX_CHARS) else {
        return content.to_owned();
    };

    collector.add_warning(
        ErrorKind::Markdown,
        format!("content truncated to {PREVIEW_MAX_CHARS} characters for preview"),
        &content[cut..],
    );

    let mut excerpt = String::with_capacity(cut + PREVIEW_TRUNCATION_MARKER.len());
    excerpt.push_str(&content[..cut]);
    excerpt.push_str(PREVIEW_TRUNCATION_MARKER);
    excerpt
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_CACHE_CONFIG: OnceCell<CacheConfig> = OnceCell::new();

/// Set the cache configuration used by [`render_service`]. Must run before the
/// first render; later calls fail.
pub fn configure_render_cache(config: CacheConfig) -> Result<(), RenderConfigError> {
    RENDER_CACHE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_cache_config() -> CacheConfig {
    RENDER_CACHE_CONFIG.get().cloned().unwrap_or_default()
}

static RENDER_SERVICE: Lazy<Arc<ContentRenderer>> =
    Lazy::new(|| Arc::new(ContentRenderer::default()));

/// Access the shared renderer, initialised on first use.
pub fn render_service() -> Arc<ContentRenderer> {
    Arc::clone(&RENDER_SERVICE)
}

/// Render `content` with the shared renderer and its process-wide cache.
pub fn render(content: Option<&str>, config: &RenderConfig) -> RenderResult {
    RENDER_SERVICE.render(content, config)
}
