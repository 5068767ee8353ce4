use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_MAX_ENTRIES;

/// Selects which pipeline stages run and with which math ceilings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Markdown, numbered directives and full-size math. Used for final display.
    #[default]
    Full,
    /// Generic directive labels and tighter math ceilings. Used for compact lists.
    Lightweight,
    /// Lightweight rendering of a truncated prefix of the input.
    Preview,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Full => "full",
            RenderMode::Lightweight => "lightweight",
            RenderMode::Preview => "preview",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(RenderMode::Full),
            "lightweight" => Ok(RenderMode::Lightweight),
            "preview" => Ok(RenderMode::Preview),
            other => Err(format!(
                "unknown render mode `{other}` (expected full, lightweight or preview)"
            )),
        }
    }
}

/// Feature toggles evaluated per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderFeatures {
    pub markdown: bool,
    pub question_syntax: bool,
    /// Reserved. Full mode numbers directives whenever `question_syntax` is set,
    /// regardless of this flag.
    pub auto_numbering: bool,
}

impl Default for RenderFeatures {
    fn default() -> Self {
        Self {
            markdown: true,
            question_syntax: true,
            auto_numbering: true,
        }
    }
}

/// How content errors are surfaced. Only `Lenient` is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    #[default]
    Lenient,
    /// Reserved; rendering falls back to lenient behaviour.
    Strict,
}

impl ErrorHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorHandling::Lenient => "lenient",
            ErrorHandling::Strict => "strict",
        }
    }
}

impl FromStr for ErrorHandling {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ErrorHandling::Lenient),
            "strict" => Ok(ErrorHandling::Strict),
            other => Err(format!(
                "unknown error handling `{other}` (expected lenient or strict)"
            )),
        }
    }
}

/// Per-call cache switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Immutable options supplied with every render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    pub features: RenderFeatures,
    pub error_handling: ErrorHandling,
    pub cache: CacheOptions,
}

impl RenderConfig {
    pub fn with_mode(mode: RenderMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn without_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }
}

/// Static counts derived from the original, untransformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderMetadata {
    pub formula_count: usize,
    pub question_directive_count: usize,
    pub markdown_element_count: usize,
}

/// Outcome of a render call. Rendering never fails; problems surface through
/// `error` and `warnings` while `html` carries inline error markers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderResult {
    pub html: String,
    /// Summary message, present iff at least one error record was collected.
    pub error: Option<String>,
    /// Messages of every warning and info record, in collection order.
    pub warnings: Vec<String>,
    pub metadata: RenderMetadata,
}

impl RenderResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Entry point implemented by the render pipeline. Implementations must be
/// deterministic: the same content and config always yield the same HTML.
pub trait RenderService: Send + Sync {
    fn render(&self, content: Option<&str>, config: &RenderConfig) -> RenderResult;
}
