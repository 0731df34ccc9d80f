//! End-to-end tests driving the `pump` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn pump() -> Command {
    Command::cargo_bin("pump").expect("binary built")
}

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("temp config");
    f.write_all(text.as_bytes()).expect("write config");
    f
}

#[test]
fn self_check_reports_ok() {
    pump()
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok"));
}

#[test]
fn self_check_json_reports_ok() {
    pump()
        .args(["--json", "self-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"ok""#));
}

#[test]
fn small_dose_runs_to_completion() {
    let log = tempfile::NamedTempFile::new().expect("temp log");
    // 0.5 uL at 100 uL/s: five 1 ms ticks. Speed is above the advisory
    // threshold, so --yes is required.
    pump()
        .args([
            "--log-file",
            log.path().to_str().expect("utf8 path"),
            "infuse",
            "--volume",
            "0.5",
            "--speed",
            "100",
            "--yes",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("finished: 0.5 uL injected"));
}

#[test]
fn advisory_volume_refused_without_yes() {
    pump()
        .args(["infuse", "--volume", "300", "--speed", "0.05"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("advisory limit")
                .and(predicate::str::contains("--yes")),
        );
}

#[test]
fn advisory_speed_refused_without_yes() {
    pump()
        .args(["infuse", "--volume", "1", "--speed", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("advisory limit"));
}

#[test]
fn json_stream_is_parseable_and_includes_low_alert() {
    let cfg = write_config(
        r#"
[reservoir]
capacity_ul = 10.0

[tick]
increment_ul = 0.1
"#,
    );
    let assert = pump()
        .args([
            "--config",
            cfg.path().to_str().expect("utf8 path"),
            "--json",
            "infuse",
            "--volume",
            "9.8",
            "--speed",
            "1000",
            "--yes",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("each stdout line is JSON"))
        .collect();
    assert!(
        lines
            .iter()
            .any(|v| v["event"] == "low_reservoir_alert"),
        "expected a low reservoir alert in: {stdout}"
    );
    let last = lines.last().expect("summary line");
    assert_eq!(last["status"], "finished");
}

#[test]
fn start_rejection_maps_to_nonzero_exit() {
    let cfg = write_config(
        r#"
[reservoir]
capacity_ul = 10.0
"#,
    );
    // More than the reservoir holds: the controller rejects the start.
    pump()
        .args([
            "--config",
            cfg.path().to_str().expect("utf8 path"),
            "infuse",
            "--volume",
            "50",
            "--speed",
            "0.05",
            "--yes",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient reservoir"));
}

#[test]
fn invalid_config_is_an_error_not_a_fallback() {
    let cfg = write_config(
        r#"
[reservoir]
capacity_ul = -1.0
"#,
    );
    pump()
        .args([
            "--config",
            cfg.path().to_str().expect("utf8 path"),
            "self-check",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("capacity_ul"));
}

#[test]
fn missing_config_falls_back_to_defaults() {
    pump()
        .args(["--config", "/nonexistent/pump.toml", "self-check"])
        .assert()
        .success();
}
