use super::*;
use crate::dataset::Target;
use crate::history::Record;
use crate::params::{ParamValue, Params};
use crate::Error;
use approx::assert_abs_diff_eq;
use ndarray::array;
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_callback_action_merge() {
    assert_eq!(CallbackAction::Continue.merge(CallbackAction::Continue), CallbackAction::Continue);
    assert_eq!(CallbackAction::Continue.merge(CallbackAction::Stop), CallbackAction::Stop);
    assert!(CallbackAction::Stop.merge(CallbackAction::Continue).is_stop());
    assert_eq!(CallbackAction::default(), CallbackAction::Continue);
}

#[test]
fn test_accuracy_and_argmax() {
    let out = array![[0.9f32, 0.1], [0.2, 0.8], [0.6, 0.4]];
    assert_eq!(argmax_rows(&out), vec![0, 1, 0]);
    let acc = accuracy(&out, &Target::from(vec![0, 1, 1])).unwrap();
    assert_abs_diff_eq!(acc, 2.0 / 3.0, epsilon = 1e-12);
    assert!(accuracy(&out, &Target::from(vec![0])).is_err());
}

#[test]
fn test_r2_score() {
    let y = Target::from(array![[1.0f32], [2.0], [3.0]]);
    assert_abs_diff_eq!(r2_score(&array![[1.0f32], [2.0], [3.0]], &y).unwrap(), 1.0);
    assert_abs_diff_eq!(r2_score(&array![[2.0f32], [2.0], [2.0]], &y).unwrap(), 0.0);
    let neg = Scoring::NegMeanSquaredError.score(&array![[2.0f32], [2.0], [2.0]], &y).unwrap();
    assert_abs_diff_eq!(neg, -2.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn test_scoring_from_str() {
    assert_eq!("accuracy".parse::<Scoring>().unwrap().name(), "accuracy");
    assert!("f1".parse::<Scoring>().is_err());
}

#[test]
fn test_print_log_table() {
    let mut log = PrintLog::new();
    let first = record(json!({
        "epoch": 1, "train_loss": 0.5, "train_loss_best": true, "valid_acc": 0.75,
        "dur": 0.01, "batches": []
    }));
    let lines = log.format_record(&first);
    assert_eq!(lines.len(), 3);
    let header: Vec<&str> = lines[0].split_whitespace().collect();
    assert_eq!(header, vec!["epoch", "train_loss", "valid_acc", "dur"]);
    assert!(lines[1].chars().all(|c| c == '-' || c == ' '));
    assert!(lines[2].contains("0.5000"));
    assert!(lines[2].contains("0.7500"));

    let second = record(json!({"epoch": 2, "train_loss": 0.25, "valid_acc": 0.8, "dur": 0.02}));
    let lines = log.format_record(&second);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].trim_start().starts_with('2'));
}

#[test]
fn test_print_log_keys_ignored() {
    let mut log = PrintLog::new();
    log.set_params(&Params::new().with("keys_ignored", vec!["valid_acc"])).unwrap();
    let lines = log.format_record(&record(json!({"epoch": 1, "valid_acc": 0.5})));
    assert!(!lines[0].contains("valid_acc"));
}

#[test]
fn test_print_log_params() {
    let mut log = PrintLog::new();
    assert_eq!(log.get_params().get("sink"), Some(&ParamValue::from("stdout")));
    log.set_params(&Params::new().with("sink", "none")).unwrap();
    assert_eq!(log.get_params().get("sink"), Some(&ParamValue::from("none")));
    assert!(log.set_params(&Params::new().with("sink", "printer")).is_err());
    assert!(matches!(
        log.set_params(&Params::new().with("colour", true)),
        Err(Error::InvalidParameter { .. })
    ));
}

#[test]
fn test_sink_buffer_captures() {
    let (sink, buf) = Sink::buffer();
    sink.write_line("hello").unwrap();
    assert_eq!(buf.lock().unwrap().as_str(), "hello\n");
    Sink::None.write_line("dropped").unwrap();
}

#[test]
fn test_builtin_by_type_name() {
    for name in ["EpochTimer", "PrintLog", "EarlyStopping", "EpochScoring", "PassthroughScoring", "LRScheduler"] {
        assert_eq!(builtin(name).unwrap().type_name(), name);
    }
    assert!(matches!(builtin("Nope"), Err(Error::UnknownCallbackType(_))));
}

#[test]
fn test_list_unique_names() {
    let mut list = CallbackList::new();
    list.push("cb0", Box::new(EpochTimer::new()));
    list.push("cb1", Box::new(EpochTimer::new()));
    assert!(list.check_unique().is_ok());
    list.push("cb0", Box::new(PrintLog::new()));
    let err = list.check_unique().unwrap_err();
    assert_eq!(err.to_string(), "The callback name 'cb0' appears more than once.");
}

#[test]
fn test_list_apply_params() {
    let mut list = CallbackList::new();
    list.push("print_log", Box::new(PrintLog::new()));
    list.push("timer", Box::new(EpochTimer::new()));

    list.apply_params(&Params::new().with("print_log__sink", "stderr")).unwrap();
    assert_eq!(list.params().get("print_log__sink"), Some(&ParamValue::from("stderr")));

    list.apply_params(&Params::new().with("timer", "PrintLog")).unwrap();
    assert_eq!(list.get("timer").unwrap().type_name(), "PrintLog");

    list.apply_params(&Params::new().with("timer", ParamValue::Null)).unwrap();
    assert!(list.is_disabled("timer"));
    assert!(list.get("timer").is_none());

    let err = list.apply_params(&Params::new().with("timer__sink", "none")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Trying to set a parameter for callback timer which does not exist."
    );
    assert!(list.apply_params(&Params::new().with("timer", 3)).is_err());
}

#[test]
fn test_early_stopping_params_round_trip() {
    let mut es = EarlyStopping::default();
    let params = Params::new().with("patience", 2).with("monitor", "train_loss");
    es.set_params(&params).unwrap();
    assert_eq!(es.patience, 2);
    assert_eq!(es.get_params().get("monitor"), Some(&ParamValue::from("train_loss")));
    es.threshold_mode = "weird".into();
    assert!(es.initialize().is_err());
}
