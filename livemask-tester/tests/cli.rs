use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "livemask-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_livemask-tester");
    let output_path = temp_path("json");
    let status = Command::new(exe)
        .args([
            "--seeds",
            "1,2",
            "--iterations",
            "1",
            "--policies",
            "idle,perfect",
            "--max-secs",
            "3",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(value["runs"].as_array().map(Vec::len), Some(4));
    assert_eq!(value["policies"].as_array().map(Vec::len), Some(2));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_writes_csv_rows() {
    let exe = env!("CARGO_BIN_EXE_livemask-tester");
    let output = Command::new(exe)
        .args([
            "--seeds",
            "5..8",
            "--iterations",
            "1",
            "--policies",
            "human",
            "--max-secs",
            "2",
            "--report",
            "csv",
        ])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout.lines().skip(1).all(|line| line.starts_with("human,")));
}

#[test]
fn cli_rejects_bad_seeds() {
    let exe = env!("CARGO_BIN_EXE_livemask-tester");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-seed", "--report", "json"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not-a-seed"));
}

#[test]
fn cli_rejects_invalid_config() {
    let exe = env!("CARGO_BIN_EXE_livemask-tester");
    let config_path = temp_path("config");
    std::fs::write(&config_path, r#"{"emotional": {"max": -5.0}}"#).expect("write config");
    let output = Command::new(exe)
        .args(["--max-secs", "1", "--iterations", "1", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let _ = std::fs::remove_file(config_path);
}

#[test]
fn cli_console_report_has_banner() {
    let exe = env!("CARGO_BIN_EXE_livemask-tester");
    let output = Command::new(exe)
        .args(["--iterations", "1", "--max-secs", "1", "--policies", "idle"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Livemask Balance Tester"));
    assert!(stdout.contains("Idle"));
}
