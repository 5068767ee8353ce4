use std::{fmt, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::application::render::RenderMode;

/// Command-line arguments for the examark binary.
#[derive(Debug, Parser)]
#[command(
    name = "examark",
    version,
    about = "Render exam-question markup to HTML fragments"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "EXAMARK_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a file (or stdin) and print the result.
    Render(RenderArgs),
    /// Print the resolved settings as JSON.
    Config,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    /// Input file; reads stdin when omitted or `-`.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the render mode.
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<RenderMode>,

    /// Leave markdown syntax untouched.
    #[arg(long = "no-markdown", action = clap::ArgAction::SetTrue)]
    pub no_markdown: bool,

    /// Leave question directives untouched.
    #[arg(long = "no-questions", action = clap::ArgAction::SetTrue)]
    pub no_questions: bool,

    /// Bypass the render cache.
    #[arg(long = "no-cache", action = clap::ArgAction::SetTrue)]
    pub no_cache: bool,

    /// Override the render cache capacity.
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The rendered fragment only.
    #[default]
    Html,
    /// The full render result, including diagnostics and metadata.
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
