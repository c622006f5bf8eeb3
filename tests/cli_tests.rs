use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Educational CS Animation Engine"));
}

#[test]
fn test_cli_storyboard_generation() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    let assert = cmd
        .arg("storyboard")
        .arg("pipeline")
        .arg("--seed")
        .arg("1")
        .arg("--resolution")
        .arg("320x180")
        .arg("--fps")
        .arg("10")
        .assert();

    assert
        .success()
        .stdout(predicate::str::contains("\"metadata\""))
        .stdout(predicate::str::contains("\"scenes\""))
        .stdout(predicate::str::contains("\"fps\": 10"));
}

#[test]
fn test_cli_storyboard_is_seed_deterministic() {
    let run = || {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
        let output = cmd
            .arg("storyboard")
            .arg("network")
            .arg("--seed")
            .arg("11")
            .arg("--resolution")
            .arg("320x180")
            .arg("--fps")
            .arg("10")
            .output()
            .unwrap();
        assert!(output.status.success());
        output.stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn test_cli_validate_generated_storyboard() {
    let dir = tempfile::tempdir().unwrap();
    let board_path = dir.path().join("board.json");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    let output = cmd
        .arg("storyboard")
        .arg("clock")
        .arg("--language")
        .arg("tr")
        .output()
        .unwrap();
    assert!(output.status.success());
    fs::write(&board_path, &output.stdout).unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    cmd.arg("validate")
        .arg(&board_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation complete"))
        .stdout(predicate::str::contains("CPU Saat Sinyali"));
}

#[test]
fn test_cli_render_small_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("frames");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    cmd.arg("render")
        .arg("pipeline")
        .arg("--language")
        .arg("en")
        .arg("--seed")
        .arg("1")
        .arg("--output")
        .arg(&output_dir)
        .arg("--force-cpu")
        .arg("--resolution")
        .arg("64x36")
        .arg("--fps")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Storyboard Summary"));

    assert!(output_dir.join("frame_0.ppm").exists());
}

#[test]
fn test_cli_render_exports_report() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("frames");
    let report_path = dir.path().join("report.json");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    cmd.arg("render")
        .arg("network")
        .arg("--seed")
        .arg("3")
        .arg("--output")
        .arg(&output_dir)
        .arg("--force-cpu")
        .arg("--resolution")
        .arg("64x36")
        .arg("--fps")
        .arg("1")
        .arg("--export-report")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Report exported"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["animation"], "network");
    assert_eq!(report["cycles"], 10);
}

#[test]
fn test_cli_render_requires_an_input() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chalkmotion"));
    cmd.arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Specify an animation"));
}
