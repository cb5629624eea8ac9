use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn tiltledger() -> Command {
    Command::cargo_bin("tiltledger").expect("binary built")
}

#[test]
fn check_config_accepts_demo_config() {
    tiltledger()
        .args(["check", "config"])
        .arg(demo("config.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration file is valid"));
}

#[test]
fn check_config_returns_nonzero_on_invalid_value() {
    let file = write_temp("[ledger]\nblock_size = 0\n");
    tiltledger()
        .args(["check", "config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("block_size"));
}

#[test]
fn simulate_demo_balances() {
    tiltledger()
        .arg("simulate")
        .arg(demo("cup_final.toml"))
        .arg("--config")
        .arg(demo("config.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("books balance"))
        .stdout(predicate::str::contains("rejected"));
}

#[test]
fn simulate_json_emits_report() {
    tiltledger()
        .args(["--json", "simulate"])
        .arg(demo("cup_final.toml"))
        .arg("--config")
        .arg(demo("config.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"report""#))
        .stdout(predicate::str::contains(r#""balanced":true"#))
        .stdout(predicate::str::contains(r#""rejected":1"#));
}

#[test]
fn simulate_strict_fails_on_rejection() {
    tiltledger()
        .arg("simulate")
        .arg(demo("cup_final.toml"))
        .arg("--config")
        .arg(demo("config.toml"))
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient free collateral"));
}

#[test]
fn simulate_reports_unknown_market() {
    let scenario = write_temp(
        r#"
[[steps]]
action = "touch"
account = "alice"

[[steps]]
action = "add_outcome"
market = "nowhere"
"#,
    );
    tiltledger()
        .args(["--quiet", "simulate"])
        .arg(scenario.path())
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown market 'nowhere'"));
}

#[test]
fn simulate_missing_scenario_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    tiltledger()
        .arg("simulate")
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}
