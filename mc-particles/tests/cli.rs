//! CLI integration tests
//!
//! Run the built binary against the fixture data sets.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("mc-particles").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_validate_clean_data_set() {
    cli()
        .arg("validate")
        .arg(fixture("vanilla-1.20.4.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("1.20.4: 4 profiles, 6 rules loaded"));
}

#[test]
fn test_validate_reports_rejections() {
    cli()
        .arg("validate")
        .arg(fixture("broken-1.19.2.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ISSUES"))
        .stdout(predicate::str::contains("block `torch` rule #0 (animateTick)"))
        .stdout(predicate::str::contains("particle `flame`"));

    cli()
        .args(["validate", "--strict"])
        .arg(fixture("broken-1.19.2.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("entries rejected"));
}

#[test]
fn test_validate_missing_and_duplicate_files() {
    let dir = TempDir::new().unwrap();
    cli()
        .arg("validate")
        .arg(dir.path().join("missing.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load data set"));

    cli()
        .arg("validate")
        .arg(fixture("vanilla-1.20.4.yaml"))
        .arg(fixture("vanilla-1.20.4.yaml"))
        .assert()
        .failure();
}

#[test]
fn test_info_lists_profiles_and_rules() {
    cli()
        .args(["info", "--hooks"])
        .arg(fixture("vanilla-1.20.4.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: 1.20.4"))
        .stdout(predicate::str::contains("small_flame"))
        .stdout(predicate::str::contains("block:candle"))
        .stdout(predicate::str::contains("LIT && CANDLES=1"))
        .stdout(predicate::str::contains("handleEntityEvent"));
}

#[test]
fn test_eval_constants_and_arguments() {
    cli()
        .args(["eval", "1 + 2 * 3"])
        .assert()
        .success()
        .stdout("7\n");

    cli()
        .args(["eval", "$0.getY() + 0.7", "--arg", "blockpos=0,64,0"])
        .assert()
        .success()
        .stdout("64.7\n");

    cli()
        .args(["eval", "this.getY() > 64", "--hook", "block:animateTick", "--pos", "3,70,3"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_eval_samples_are_seeded() {
    let run = || {
        cli()
            .args(["eval", "random()", "-n", "3", "--seed", "5"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    let first = run();
    assert_eq!(first, run());
    assert_eq!(String::from_utf8(first).unwrap().lines().count(), 3);
}

#[test]
fn test_eval_errors() {
    cli()
        .args(["eval", "7 / 0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("integer division by zero"));

    cli()
        .args(["eval", "foo + 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown identifier `foo`"));

    cli()
        .args(["eval", "1", "--arg", "quaternion=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown value kind"));
}

#[test]
fn test_simulate_json_snapshot() {
    let output = cli()
        .arg("simulate")
        .arg(fixture("vanilla-1.20.4.yaml"))
        .args([
            "--source",
            "block:candle",
            "--props",
            "LIT=true,CANDLES=1",
            "--ticks",
            "5",
            "--seed",
            "3",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let snapshot: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(snapshot["tick"], 5);
    let particles = snapshot["particles"].as_array().unwrap();
    let flames = particles
        .iter()
        .filter(|p| p["particle"] == "small_flame")
        .count();
    assert_eq!(flames, 5);
    assert!(particles[0].get("renderColor").is_some());
}

#[test]
fn test_simulate_summary_with_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("sim.yaml");
    std::fs::write(&config, "seed: 11\nmax_particles: 2\n").unwrap();

    cli()
        .arg("simulate")
        .arg(fixture("vanilla-1.20.4.yaml"))
        .args(["--source", "block:redstone_wire", "--props", "POWER=15", "--ticks", "4"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation Summary"))
        .stdout(predicate::str::contains("Live particles: 2"))
        .stdout(predicate::str::contains("store full"));
}

#[test]
fn test_simulate_bad_source() {
    cli()
        .arg("simulate")
        .arg(fixture("vanilla-1.20.4.yaml"))
        .args(["--source", "candle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected kind:id"));
}

#[test]
fn test_completions() {
    cli()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mc-particles"));
}
