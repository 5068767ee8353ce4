//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::{
    CacheOptions, ErrorHandling, RenderConfig, RenderFeatures, RenderMode,
};
use crate::cache::DEFAULT_MAX_ENTRIES;

pub use cli::{
    CliArgs, Command, LoggingOverrides, OutputFormat, RenderArgs, RenderOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "examark";
const ENV_PREFIX: &str = "EXAMARK";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: NonZeroUsize,
}

/// Defaults for the per-call [`RenderConfig`].
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub mode: RenderMode,
    pub markdown: bool,
    pub question_syntax: bool,
    pub error_handling: ErrorHandling,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

impl Settings {
    /// Per-call render options derived from these settings.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            mode: self.render.mode,
            features: RenderFeatures {
                markdown: self.render.markdown,
                question_syntax: self.render.question_syntax,
                ..RenderFeatures::default()
            },
            error_handling: self.render.error_handling,
            cache: CacheOptions {
                enabled: self.cache.enabled,
                max_entries: self.cache.max_entries.get(),
            },
        }
    }

    /// JSON view for `examark config`.
    pub fn to_json(&self) -> Value {
        json!({
            "logging": {
                "level": self.logging.level.to_string().to_lowercase(),
                "json": self.logging.format == LogFormat::Json,
            },
            "cache": {
                "enabled": self.cache.enabled,
                "max_entries": self.cache.max_entries.get(),
            },
            "render": {
                "mode": self.render.mode.as_str(),
                "markdown": self.render.markdown,
                "question_syntax": self.render.question_syntax,
                "error_handling": self.render.error_handling.as_str(),
            },
        })
    }

    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            render,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            render: build_render_settings(render)?,
        })
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_logging_overrides(&cli.logging);
    if let Command::Render(args) = &cli.command {
        raw.apply_render_overrides(&args.overrides);
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(mode) = overrides.mode {
            self.render.mode = Some(mode.as_str().to_string());
        }
        if overrides.no_markdown {
            self.render.markdown = Some(false);
        }
        if overrides.no_questions {
            self.render.question_syntax = Some(false);
        }
        if overrides.no_cache {
            self.cache.enabled = Some(false);
        }
        if let Some(max) = overrides.cache_max_entries {
            self.cache.max_entries = Some(max);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    max_entries: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    mode: Option<String>,
    markdown: Option<bool>,
    question_syntax: Option<bool>,
    error_handling: Option<String>,
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let max_entries = cache.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES as u64);

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        max_entries: non_zero_usize(max_entries, "cache.max_entries")?,
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let mode = match render.mode {
        Some(mode) => {
            RenderMode::from_str(&mode).map_err(|reason| LoadError::invalid("render.mode", reason))?
        }
        None => RenderMode::default(),
    };

    let error_handling = match render.error_handling {
        Some(value) => ErrorHandling::from_str(&value)
            .map_err(|reason| LoadError::invalid("render.error_handling", reason))?,
        None => ErrorHandling::default(),
    };

    Ok(RenderSettings {
        mode,
        markdown: render.markdown.unwrap_or(true),
        question_syntax: render.question_syntax.unwrap_or(true),
        error_handling,
    })
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
