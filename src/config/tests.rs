use std::io::Write;

use serial_test::serial;

use super::*;

fn render_cli(args: &[&str]) -> CliArgs {
    let mut argv = vec!["examark", "render"];
    argv.extend_from_slice(args);
    CliArgs::parse_from(argv)
}

fn render_overrides(cli: &CliArgs) -> &RenderOverrides {
    match &cli.command {
        Command::Render(args) => &args.overrides,
        Command::Config => panic!("expected render command"),
    }
}

#[test]
fn defaults_match_render_config_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert_eq!(settings.cache.max_entries.get(), DEFAULT_MAX_ENTRIES);
    assert_eq!(settings.render_config(), RenderConfig::default());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.render.mode = Some("full".to_string());
    raw.logging.level = Some("info".to_string());
    raw.cache.max_entries = Some(50);

    let cli = render_cli(&["--mode", "preview", "--cache-max-entries", "7"]);
    raw.apply_render_overrides(render_overrides(&cli));
    raw.apply_logging_overrides(&LoggingOverrides {
        log_level: Some("debug".to_string()),
        log_json: None,
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.render.mode, RenderMode::Preview);
    assert_eq!(settings.cache.max_entries.get(), 7);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn feature_switches_disable_stages_and_cache() {
    let mut raw = RawSettings::default();
    let cli = render_cli(&["--no-markdown", "--no-questions", "--no-cache"]);
    raw.apply_render_overrides(render_overrides(&cli));

    let config = Settings::from_raw(raw)
        .expect("valid settings")
        .render_config();

    assert!(!config.features.markdown);
    assert!(!config.features.question_syntax);
    assert!(!config.cache.enabled);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_logging_overrides(&LoggingOverrides {
        log_level: None,
        log_json: Some(true),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.max_entries = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.max_entries",
            ..
        }
    ));
}

#[test]
fn unknown_render_mode_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.mode = Some("compact".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown mode must fail");
    assert!(err.to_string().contains("render.mode"), "{err}");
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));
}

#[test]
fn parse_render_arguments() {
    let cli = CliArgs::parse_from([
        "examark",
        "--log-level",
        "trace",
        "render",
        "question.md",
        "--mode",
        "lightweight",
        "--format",
        "json",
    ]);

    assert_eq!(cli.logging.log_level.as_deref(), Some("trace"));
    match cli.command {
        Command::Render(args) => {
            assert_eq!(
                args.file.as_deref(),
                Some(std::path::Path::new("question.md"))
            );
            assert_eq!(args.overrides.mode, Some(RenderMode::Lightweight));
            assert_eq!(args.format, OutputFormat::Json);
        }
        Command::Config => panic!("wrong command parsed"),
    }
}

#[test]
fn global_flags_are_accepted_after_subcommand() {
    let cli = CliArgs::parse_from(["examark", "config", "--log-json", "true"]);
    assert_eq!(cli.logging.log_json, Some(true));
    assert!(matches!(cli.command, Command::Config));
}

#[test]
#[serial]
fn file_then_environment_then_cli() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        "[cache]\nmax_entries = 10\n\n[render]\nmode = \"lightweight\"\nmarkdown = false"
    )
    .expect("write config");

    // SAFETY: serialised with other environment-dependent tests.
    unsafe {
        std::env::set_var("EXAMARK__CACHE__MAX_ENTRIES", "20");
    }

    let path = file.path().to_string_lossy().into_owned();
    let cli = CliArgs::parse_from(["examark", "--config-file", &path, "render", "--mode", "preview"]);
    let loaded = load(&cli);

    unsafe {
        std::env::remove_var("EXAMARK__CACHE__MAX_ENTRIES");
    }

    let settings = loaded.expect("settings load");
    assert_eq!(settings.cache.max_entries.get(), 20);
    assert_eq!(settings.render.mode, RenderMode::Preview);
    assert!(!settings.render.markdown);
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    let cli = CliArgs::parse_from([
        "examark",
        "--config-file",
        "/nonexistent/examark-config.toml",
        "config",
    ]);

    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}

#[test]
fn settings_json_view() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let view = settings.to_json();

    assert_eq!(view["render"]["mode"], "full");
    assert_eq!(view["cache"]["max_entries"], 100);
    assert_eq!(view["logging"]["level"], "warn");
}
