use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process,
};

use examark::{
    application::render::{RenderConfigError, RenderResult, configure_render_cache, render},
    cache::CacheConfig,
    config::{self, Command, LoadError, OutputFormat, RenderArgs, Settings},
    infra::{error::InfraError, telemetry},
};
use thiserror::Error;
use tracing::{Dispatch, Level, debug, dispatcher, error, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Render(#[from] RenderConfigError),
    #[error("failed to read `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
}

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &CliError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "examark failed");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "examark failed");
    });
}

fn run() -> Result<(), CliError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    configure_render_cache(CacheConfig::from(&settings.cache))?;

    match cli_args.command {
        Command::Render(args) => run_render(&settings, &args),
        Command::Config => print_settings(&settings),
    }
}

fn run_render(settings: &Settings, args: &RenderArgs) -> Result<(), CliError> {
    let content = read_input(args.file.as_deref())?;
    let config = settings.render_config();

    let result = render(Some(&content), &config);
    if let Some(message) = result.error.as_deref() {
        warn!(target: "examark::cli", error = message, "content rendered with errors");
    }
    debug!(
        target: "examark::cli",
        mode = %config.mode,
        formulas = result.metadata.formula_count,
        directives = result.metadata.question_directive_count,
        format = %args.format,
        "render finished"
    );

    write_result(&result, args.format)
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .map_err(|source| CliError::Read {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            Ok(content)
        }
    }
}

fn write_result(result: &RenderResult, format: OutputFormat) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Html => writeln!(out, "{}", result.html).map_err(CliError::Write),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, result)?;
            writeln!(out).map_err(CliError::Write)
        }
    }
}

fn print_settings(settings: &Settings) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &settings.to_json())?;
    writeln!(out).map_err(CliError::Write)
}
