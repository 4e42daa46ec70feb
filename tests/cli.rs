//! The `skorch` binary driven end to end

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_skorch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skorch"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("skorch binary should execute")
}

fn write_run(dir: &Path) -> String {
    let x: Vec<Vec<f32>> = (0..30).map(|i| vec![(i % 3) as f32 - 1.0, (i % 7) as f32 / 7.0]).collect();
    let y: Vec<f32> = x.iter().map(|r| r[0] - r[1]).collect();
    let data = serde_json::json!({ "x": x, "y": y });
    std::fs::write(dir.join("data.json"), data.to_string()).unwrap();
    let spec = "\
kind: regressor
module:
  in_features: 2
  out_features: 1
params:
  max_epochs: 4
  batch_size: 10
output:
  history: out/history.json
data: data.json
";
    let path = dir.join("run.yaml");
    std::fs::write(&path, spec).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn fit_then_query_history() {
    let dir = TempDir::new().unwrap();
    let spec = write_run(dir.path());

    let output = run_skorch(&["fit", &spec, "--epochs", "2"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "fit failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Fit complete!"));
    assert!(stdout.contains("train_loss"));

    let history = dir.path().join("out/history.json");
    let output = run_skorch(&["history", history.to_str().unwrap(), ":,epoch"]);
    assert!(output.status.success());
    let epochs: Vec<u64> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(epochs, vec![1, 2]);
}

#[test]
fn quiet_fit_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let spec = write_run(dir.path());
    let output = run_skorch(&["-q", "fit", &spec]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    let spec = write_run(dir.path());
    let output = run_skorch(&["validate", &spec]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("is valid"));

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "module: {in_features: 2}\ndata: data.json\n").unwrap();
    let output = run_skorch(&["validate", bad.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid spec"));
}

#[test]
fn schedule_prints_json() {
    let output = run_skorch(&["schedule", "cyclic", "--steps", "3", "--base-lr", "0.1", "--max-lr", "0.3", "--step-size", "1", "--json"]);
    assert!(output.status.success());
    let values: Vec<f64> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(values.len(), 3);
    assert!((values[1] - 0.3).abs() < 1e-12);
}
