use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML for a fast simulated run
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[encoders]
ppr = 256
wheel_diameter_mm = 65.0

[control]
max_speed_mps = 1.0
vehicle_gains = [0.5, 4.0, 0.0]
motor_gains = { p = 100.0, i = 1000.0, d = 0.0 }

[watchdog]
timeout_ms = 300

[runner]
# one simulated millisecond per idle poll keeps the runs short
idle_sleep_us = 1000
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["drive", "--duration-ms", "500"], 0, "drive ended", "stdout")]
#[case(&["drive", "--duration-ms", "1000", "--script", "y254,", "--fail-on-watchdog"], 3, "watchdog", "stderr")]
#[case(&["drive", "--bogus"], 2, "unexpected argument", "stderr")]
#[case(&["decode", "--input", "x200,??,Q,"], 0, "x 200\nQ 0", "stdout")]
#[case(&["encode", "y200", "Q"], 0, "y200,Q,", "stdout")]
#[case(&["encode", "12"], 1, "must start with a letter", "stderr")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("buggy").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[encoders]\nppr = 0\nwheel_diameter_mm = 65.0\n").unwrap();

    Command::cargo_bin("buggy")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("encoders.ppr must be > 0"));
}

#[rstest]
fn missing_encoders_section_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "[control]\nmax_speed_mps = 1.0\n").unwrap();

    Command::cargo_bin("buggy")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be parsed"));
}

#[rstest]
fn telemetry_csv_is_written() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv_path = dir.path().join("telemetry.csv");

    Command::cargo_bin("buggy")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("drive")
        .arg("--duration-ms")
        .arg("1000")
        .arg("--target-mps")
        .arg("0.3")
        .arg("--keepalive-ms")
        .arg("100")
        .arg("--telemetry")
        .arg(&csv_path)
        .assert()
        .success();

    let text = fs::read_to_string(&csv_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "t_ms,status,target_mps,vehicle_mps,left_mps,right_mps,wheel_target_mps,left_cmd,right_cmd,plant_mps"
    );
    let rows: Vec<&str> = lines.collect();
    assert!(rows.len() >= 9, "only {} rows", rows.len());
    assert!(rows.iter().any(|r| r.contains(",driving,")));
}

#[rstest]
fn show_tx_prints_report_frames() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("buggy")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("drive")
        .arg("--duration-ms")
        .arg("250")
        .arg("--show-tx")
        .assert()
        .success()
        .stdout(predicate::str::contains("x127,l127,r127,"));
}

#[rstest]
fn chained_encode_round_trips_through_decode() {
    let encoded = Command::cargo_bin("buggy")
        .unwrap()
        .args(["encode", "a1", "--text", "hi", "--chained"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let frames = String::from_utf8(encoded).unwrap();
    assert_eq!(frames.trim_end(), "a1,p104,p105,p,");

    assert_cmd::Command::cargo_bin("buggy")
        .unwrap()
        .arg("decode")
        .write_stdin(frames)
        .assert()
        .success()
        .stdout(predicate::str::contains("a 1\ntext \"hi\""));
}
