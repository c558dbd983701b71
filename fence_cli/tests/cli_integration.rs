use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML config for the sim backend; calibration lands in `dir`.
fn write_config(dir: &Path, sim: &str) -> PathBuf {
    let storage = dir.join("calibration.toml");
    let toml = format!(
        r#"
[pins]
# pins are unused by the sim backend but must be present
motor_step = 13
motor_dir = 19
limit_left = 20
limit_right = 21

[storage]
path = "{}"

[sim]
{sim}
"#,
        storage.display().to_string().replace('\\', "/")
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn fence(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fence").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["move", "--inches", "12"], 0, "reached: 12.", "stdout")]
#[case(&["move"], 2, "required", "stderr")]
#[case(&["move", "--inches", "500"], 0, "clamped", "stdout")]
#[case(&["move", "--inches", "-3"], 0, "clamped", "stdout")]
#[case(&["zero-to-blade"], 0, "(64935 steps)", "stdout")]
#[case(&["nudge", "--direction", "right"], 0, "(3 steps)", "stdout")]
#[case(&["self-check"], 0, "self-check ok (sim)", "stdout")]
#[case(&["settings", "apply", "--set", "working_speed=9000"], 6, "Calibration rejected", "stderr")]
#[case(&["settings", "apply", "--set", "blade=1"], 6, "unknown setting", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");

    let mut cmd = fence(&cfg);
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
fn missing_config_is_reported() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("fence")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read config"));
}

#[rstest]
fn malformed_config_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fence_config.toml");
    fs::write(&path, "[pins]\nmotor_step = \"seventeen\"\n").unwrap();
    Command::cargo_bin("fence")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid or incomplete"));
}

#[rstest]
fn invalid_config_names_the_key() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "left_trip = 10\nright_trip = 5");
    fence(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sim.left_trip"));
}

#[rstest]
fn right_limit_trip_reports_bounce_position_as_json() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "right_trip = 7000\nstart_at = 5000");
    let out = fence(&cfg)
        .args(["--json", "move", "--inches", "10"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["outcome"], "limit_hit");
    assert_eq!(v["limit"], "right");
    assert_eq!(v["position_steps"], 6879);
    assert_eq!(v["clamped"], false);
}

#[rstest]
fn park_rezeroes_at_left_switch() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "start_at = 3000");
    fence(&cfg)
        .arg("park")
        .assert()
        .success()
        .stdout(predicate::str::contains("reached: 0.0000 in (0 steps)"));
}

#[rstest]
fn settings_saved_then_shown() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    fence(&cfg)
        .args(["settings", "apply", "--set", "kerf=0.09", "--set", "working_speed=1500", "--save"])
        .assert()
        .success();
    assert!(dir.path().join("calibration.toml").exists());
    fence(&cfg)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kerf = 0.09"))
        .stdout(predicate::str::contains("working_speed = 1500"));
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let out = fence(&cfg)
        .args(["--json", "settings", "apply", "--set", "kerf=-1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no JSON error in: {stderr}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "InvalidCalibration");
}

#[rstest]
fn bad_cut_list_header_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let csv = dir.path().join("cuts.csv");
    fs::write(&csv, "name,length\nrail,12\n").unwrap();
    let script = dir.path().join("panel.txt");
    fs::write(&script, "press next\n").unwrap();
    fence(&cfg)
        .arg("--cut-list")
        .arg(&csv)
        .arg("panel")
        .arg("--script")
        .arg(&script)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("label,inches"));
}
