use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

// Calibration of 0.01 in/step keeps printed positions exact.
fn write_config(dir: &Path) -> std::path::PathBuf {
    fs::write(
        dir.join("calibration.toml"),
        "distance_per_step = 0.01\nleft_travel_inches = 100.0\n",
    )
    .unwrap();
    let toml = format!(
        r#"
[pins]
motor_step = 13
motor_dir = 19
limit_left = 20
limit_right = 21

[storage]
path = "{}"
"#,
        dir.join("calibration.toml")
            .display()
            .to_string()
            .replace('\\', "/")
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn run_script(dir: &Path, script: &str, extra: &[&str]) -> std::process::Output {
    let cfg = write_config(dir);
    let path = dir.join("panel.txt");
    fs::write(&path, script).unwrap();
    Command::cargo_bin("fence")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .args(extra)
        .arg("panel")
        .arg("--script")
        .arg(&path)
        .output()
        .unwrap()
}

#[test]
fn script_drives_moves_and_settings() {
    let dir = tempdir().unwrap();
    let out = run_script(
        dir.path(),
        "# cut a 12 inch rail\n\
         text move-distance 12\n\
         press move-stop\n\
         switch travel on\n\
         switch left-right off\n\
         text move-distance 2\n\
         press move-stop\n\
         slide speed 25\n\
         text setting.kerf 0.1\n\
         press apply\n\
         press save\n",
        &[],
    );
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("position 12.0"), "{stdout}");
    assert!(stdout.contains("position 10.0"), "{stdout}");
    assert!(stdout.contains("speed 25% (1000 steps/s)"), "{stdout}");
    assert!(stdout.contains("settings applied"), "{stdout}");
    assert!(stdout.contains("settings saved"), "{stdout}");
    let saved = fs::read_to_string(dir.path().join("calibration.toml")).unwrap();
    assert!(saved.contains("kerf = \"0.1\""), "{saved}");
}

#[test]
fn cut_list_next_emits_json_events() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("cuts.csv");
    fs::write(&csv, "label,inches\nrail,23.5\nstile,11.25\n").unwrap();
    let out = run_script(
        dir.path(),
        "press next\npress next\npress next\n",
        &["--json", "--cut-list", csv.to_str().unwrap()],
    );
    assert!(out.status.success());
    let events: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();
    assert_eq!(
        kinds,
        vec!["cut_selected", "position", "cut_selected", "position", "rejected"]
    );
    assert_eq!(events[0]["label"], "rail");
    assert!((events[3]["inches"].as_f64().unwrap() - 11.25).abs() < 1e-3);
}

#[test]
fn faults_are_printed_and_script_finishes_with_fault_exit_code() {
    let dir = tempdir().unwrap();
    let out = run_script(
        dir.path(),
        "switch power off\ntext move-distance 5\npress move-stop\nswitch power on\npress move-stop\n",
        &[],
    );
    assert_eq!(out.status.code(), Some(10));
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("1 event(s) faulted"),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("motor off"), "{stdout}");
    assert!(stdout.contains("FAULT motor is powered off"), "{stdout}");
    assert!(stdout.contains("position 5.0"), "{stdout}");
}

#[test]
fn script_syntax_error_aborts_before_motion() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    let path = dir.path().join("panel.txt");
    fs::write(&path, "press park\nwiggle\n").unwrap();
    Command::cargo_bin("fence")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("panel")
        .arg("--script")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("script line 2"));
}
