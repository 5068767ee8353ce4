use assert_cmd::Command;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn examark() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("examark"));
    cmd.env_remove("EXAMARK_CONFIG_FILE")
        .env_remove("EXAMARK__RENDER__MODE")
        .env_remove("EXAMARK__CACHE__MAX_ENTRIES")
        .env_remove("RUST_LOG");
    cmd
}

fn input_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write input");
    file
}

#[test]
fn renders_file_to_html() {
    let input = input_file("\\subq First \\subq Second");

    examark()
        .arg("render")
        .arg(input.path())
        .assert()
        .success()
        .stdout(contains("<span class=\"exam-part-label\">(1)</span> First"))
        .stdout(contains("<span class=\"exam-part-label\">(2)</span> Second"));
}

#[test]
fn renders_stdin_in_lightweight_mode() {
    examark()
        .args(["render", "--mode", "lightweight"])
        .write_stdin("**bold** \\subq part")
        .assert()
        .success()
        .stdout(contains("**bold**"))
        .stdout(contains(">sub-part</span> part"));
}

#[test]
fn json_output_reports_math_errors_without_failing() {
    let assert = examark()
        .args(["render", "--format", "json", "-"])
        .write_stdin("ok $x$ and broken $\\frac{1$")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    let result: serde_json::Value = serde_json::from_str(&output).expect("json output");
    assert_eq!(result["metadata"]["formula_count"], 2);
    assert!(
        result["error"]
            .as_str()
            .is_some_and(|message| message.starts_with("math rendering failed")),
        "unexpected error field: {}",
        result["error"]
    );
    assert!(
        result["html"]
            .as_str()
            .is_some_and(|html| html.contains("class=\"math-error\""))
    );
}

#[test]
fn config_file_sets_defaults_and_command_prints_them() {
    let config = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp config");
    std::fs::write(config.path(), "[render]\nmode = \"preview\"\n").expect("write config");

    examark()
        .arg("--config-file")
        .arg(config.path())
        .arg("config")
        .assert()
        .success()
        .stdout(contains("\"mode\": \"preview\""));
}

#[test]
fn missing_input_file_fails() {
    examark()
        .args(["render", "/nonexistent/question.md"])
        .assert()
        .failure()
        .stderr(contains("failed to read"));
}

#[test]
fn invalid_setting_fails_fast() {
    examark()
        .env("EXAMARK__RENDER__MODE", "compact")
        .arg("config")
        .assert()
        .failure()
        .stderr(contains("render.mode"));
}
