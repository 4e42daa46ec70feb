use super::*;
use crate::cli::LogLevel;
use crate::config::{parse_args, FitArgs, HistoryArgs, ScheduleArgs, SchedulePolicy};
use crate::history::History;
use approx::assert_relative_eq;
use tempfile::TempDir;

const SPEC: &str = r"
kind: classifier
module:
  in_features: 2
  out_features: 2
  num_units: 6
params:
  max_epochs: 3
  lr: 0.1
  verbose: 0
  train_split: null
callbacks:
  - name: early
    type: EarlyStopping
    params:
      monitor: train_loss
      patience: 5
data: data.json
output:
  params: out/model.safetensors
  history: out/history.json
";

fn write_run(dir: &TempDir) -> std::path::PathBuf {
    let x: Vec<Vec<f32>> = (0..20).map(|i| vec![(i % 2) as f32, (i % 5) as f32 / 5.0]).collect();
    let y: Vec<usize> = (0..20).map(|i| i % 2).collect();
    let data = serde_json::json!({ "x": x, "y": y });
    std::fs::write(dir.path().join("data.json"), data.to_string()).unwrap();
    let spec = dir.path().join("run.yaml");
    std::fs::write(&spec, SPEC).unwrap();
    spec
}

fn fit_args(spec: std::path::PathBuf) -> FitArgs {
    FitArgs { spec, epochs: None, lr: None, batch_size: None, seed: None, dry_run: false }
}

fn schedule_args(policy: SchedulePolicy) -> ScheduleArgs {
    let argv = match policy {
        SchedulePolicy::WarmRestart => ["skorch", "schedule", "warm-restart"],
        SchedulePolicy::Cyclic => ["skorch", "schedule", "cyclic"],
    };
    match parse_args(argv).unwrap().command {
        crate::config::Command::Schedule(args) => args,
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_log_level_from_flags() {
    assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
    assert_eq!(LogLevel::from_flags(true, false), LogLevel::Verbose);
    assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
    assert_eq!(LogLevel::Verbose.directive(), "skorch=debug");
}

#[test]
fn test_fit_writes_outputs() {
    let dir = TempDir::new().unwrap();
    let net = fit_from_spec(&fit_args(write_run(&dir)), LogLevel::Quiet).unwrap();
    assert_eq!(net.history().len(), 3);

    let history = History::load(dir.path().join("out/history.json")).unwrap();
    assert_eq!(&history, net.history());
    assert!(dir.path().join("out/model.safetensors").exists());
}

#[test]
fn test_fit_applies_overrides() {
    let dir = TempDir::new().unwrap();
    let args = FitArgs { epochs: Some(1), lr: Some(0.5), ..fit_args(write_run(&dir)) };
    let net = fit_from_spec(&args, LogLevel::Quiet).unwrap();
    assert_eq!(net.history().len(), 1);
    assert_eq!(net.config().lr, 0.5);
}

#[test]
fn test_fit_rejects_invalid_override() {
    let dir = TempDir::new().unwrap();
    let args = FitArgs { lr: Some(-1.0), ..fit_args(write_run(&dir)) };
    let err = fit_from_spec(&args, LogLevel::Quiet).unwrap_err();
    assert!(err.to_string().contains("Invalid spec after overrides"));
}

#[test]
fn test_dry_run_initializes_without_fitting() {
    let dir = TempDir::new().unwrap();
    let args = FitArgs { dry_run: true, ..fit_args(write_run(&dir)) };
    let net = fit_from_spec(&args, LogLevel::Quiet).unwrap();
    assert!(net.is_initialized());
    assert!(net.history().is_empty());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_fit_requires_targets() {
    let dir = TempDir::new().unwrap();
    let spec = write_run(&dir);
    std::fs::write(dir.path().join("data.json"), r#"{"x": [[0.0, 1.0]]}"#).unwrap();
    let err = fit_from_spec(&fit_args(spec), LogLevel::Quiet).unwrap_err();
    assert!(err.to_string().contains("has no y"));
}

#[test]
fn test_history_query() {
    let dir = TempDir::new().unwrap();
    fit_from_spec(&fit_args(write_run(&dir)), LogLevel::Quiet).unwrap();
    let file = dir.path().join("out/history.json");

    let epochs = query_history(&HistoryArgs { file: file.clone(), path: Some(":,epoch".into()) }).unwrap();
    assert_eq!(serde_json::from_str::<Vec<u64>>(&epochs).unwrap(), vec![1, 2, 3]);

    let whole = query_history(&HistoryArgs { file: file.clone(), path: None }).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&whole).unwrap().as_array().unwrap().len(), 3);

    let err = query_history(&HistoryArgs { file, path: Some("-1,missing".into()) });
    assert!(err.is_err());
}

#[test]
fn test_warm_restart_schedule_values() {
    let args = ScheduleArgs { steps: 4, min_lr: 0.0, max_lr: Some(1.0), base_period: 2.0, ..schedule_args(SchedulePolicy::WarmRestart) };
    let values = schedule_values(&args).unwrap();
    assert_eq!(values.len(), 4);
    assert_relative_eq!(values[0], 1.0);
    assert_relative_eq!(values[1], 0.5, epsilon = 1e-12);
    assert_relative_eq!(values[2], 0.0, epsilon = 1e-12);
    // restart
    assert_relative_eq!(values[3], 1.0);
}

#[test]
fn test_cyclic_schedule_values() {
    let args = ScheduleArgs { steps: 5, base_lr: 0.1, max_lr: Some(0.5), step_size: 2.0, ..schedule_args(SchedulePolicy::Cyclic) };
    let values = schedule_values(&args).unwrap();
    let expected = [0.1, 0.3, 0.5, 0.3, 0.1];
    for (v, e) in values.iter().zip(expected) {
        assert_relative_eq!(*v, e, epsilon = 1e-12);
    }
}

#[test]
fn test_schedule_rejects_bad_mode() {
    let args = ScheduleArgs { mode: "sawtooth".into(), ..schedule_args(SchedulePolicy::Cyclic) };
    assert!(schedule_values(&args).is_err());
}

#[test]
fn test_format_schedule() {
    let table = format_schedule(&[0.1, 0.05], false).unwrap();
    assert_eq!(table.lines().count(), 3);
    assert!(table.lines().nth(1).unwrap().contains("0.10000000"));
    assert_eq!(format_schedule(&[0.1, 0.05], true).unwrap(), "[0.1,0.05]");
}

#[test]
fn test_run_command_validate() {
    let dir = TempDir::new().unwrap();
    let spec = write_run(&dir);
    let cli = parse_args(["skorch", "-q", "validate", spec.to_str().unwrap()]).unwrap();
    run_command(cli).unwrap();

    let cli = parse_args(["skorch", "-q", "validate", "does-not-exist.yaml"]).unwrap();
    assert!(run_command(cli).is_err());
}
