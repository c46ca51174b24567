use assert_cmd::Command;
use nemde_algo::{run_interval, test_fixtures, CancelFlag, DispatchConfig};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_json(dir: &Path, name: &str, value: &impl serde::Serialize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn nemde() -> Command {
    let mut cmd = Command::cargo_bin("nemde").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn check_reports_counts() {
    let dir = tempdir().unwrap();
    let case = write_json(dir.path(), "two.json", &test_fixtures::two_region_with_fcas());
    nemde()
        .args(["check", case.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("TWO_REGION"))
        .stdout(predicate::str::contains("INTERCONNECTORS"))
        .stdout(predicate::str::contains("No issues"));
}

#[test]
fn check_rejects_broken_reference() {
    let dir = tempdir().unwrap();
    let case = write_json(dir.path(), "single.json", &test_fixtures::single_region());
    nemde()
        .args([
            "check",
            case.to_str().unwrap(),
            "--set",
            "/traders/0/region_id=QLD1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("region_id"));
}

#[test]
fn run_prints_regional_price() {
    let dir = tempdir().unwrap();
    let case = write_json(dir.path(), "single.json", &test_fixtures::single_region());
    let out = dir.path().join("out");
    nemde()
        .args([
            "run",
            case.to_str().unwrap(),
            "--algorithm",
            "dispatch-only",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("solved"))
        .stdout(predicate::str::contains("NSW1"));
    let solution: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("solution.json")).unwrap()).unwrap();
    let price = solution["RegionSolution"][0]["EnergyPrice"].as_f64().unwrap();
    assert!((price - 50.0).abs() < 1e-3);
    assert!(!out.join("report.json").exists());
}

#[test]
fn run_with_mismatched_history_exits_with_two() {
    let dir = tempdir().unwrap();
    let mut casefile = test_fixtures::single_region();
    let outcome = run_interval(&casefile, &DispatchConfig::default(), &CancelFlag::new());
    let mut historical = outcome.solution.unwrap();
    historical.region_solution[0].energy_price = 75.0;
    casefile.historical = Some(historical);
    let case = write_json(dir.path(), "single.json", &casefile);

    nemde()
        .args(["run", case.to_str().unwrap()])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("validated_fail"))
        .stdout(predicate::str::contains("EnergyPrice"));
}

#[test]
fn run_json_output_is_an_interval_outcome() {
    let dir = tempdir().unwrap();
    let case = write_json(dir.path(), "load.json", &test_fixtures::generator_and_load());
    let output = nemde()
        .args(["run", case.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["case_id"], "LOAD");
    assert_eq!(value["kind"], "solved");
}

#[test]
fn unreadable_casefile_is_an_input_error() {
    let dir = tempdir().unwrap();
    let case = dir.path().join("20201101001.json");
    fs::write(&case, "{").unwrap();
    nemde()
        .args(["run", case.to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("input_error"));
}

#[test]
fn batch_writes_manifest() {
    let dir = tempdir().unwrap();
    let cases = dir.path().join("cases");
    fs::create_dir_all(&cases).unwrap();
    write_json(&cases, "a.json", &test_fixtures::single_region());
    write_json(&cases, "b.json", &test_fixtures::tied_generators());
    let out = dir.path().join("out");

    nemde()
        .args([
            "batch",
            cases.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--threads",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 ok, 0 failed"));
    assert!(out.join("batch_manifest.json").exists());
    assert!(out.join("SINGLE").join("solution.json").exists());
    assert!(out.join("TIED").join("solution.json").exists());
}

#[test]
fn config_file_sets_algorithm() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("nemde.toml");
    fs::write(&config, "[dispatch]\nalgorithm = \"dispatch_only\"\n").unwrap();
    let case = write_json(dir.path(), "single.json", &test_fixtures::single_region());
    let output = nemde()
        .args([
            "--config",
            config.to_str().unwrap(),
            "run",
            case.to_str().unwrap(),
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["solution"]["CaseSolution"]["Solves"], 1);
}
