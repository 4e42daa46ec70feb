//! Tests for the history ledger

use super::*;
use proptest::prelude::*;
use serde_json::json;

fn filled_history() -> History {
    let mut h = History::new();
    for epoch in 0..3 {
        h.new_epoch();
        h.record("epoch", epoch + 1).unwrap();
        for batch in 0..2 {
            h.new_batch().unwrap();
            h.record_batch("train_loss", f64::from(epoch * 10 + batch)).unwrap();
        }
        h.record("train_loss", f64::from(epoch)).unwrap();
        if epoch > 0 {
            h.record("valid_acc", f64::from(epoch) * 0.25).unwrap();
        }
    }
    h
}

#[test]
fn test_record_before_epoch_fails() {
    let mut h = History::new();
    assert!(h.record("loss", 1.0).is_err());
    assert!(h.new_batch().is_err());
    h.new_epoch();
    assert!(h.record_batch("loss", 1.0).is_err());
}

#[test]
fn test_new_epoch_has_empty_batches() {
    let mut h = History::new();
    h.new_epoch();
    assert_eq!(h.get(&"-1,batches".parse().unwrap()).unwrap(), json!([]));
    assert_eq!(h.len(), 1);
}

#[test]
fn test_index_and_key() {
    let h = filled_history();
    assert_eq!(h.get(&HistoryPath::key(-1, "train_loss")).unwrap(), json!(2.0));
    assert_eq!(h.get(&HistoryPath::key(0, "epoch")).unwrap(), json!(1));
    assert!(h.get(&HistoryPath::key(0, "valid_acc")).is_err());
    assert!(h.get(&HistoryPath::key(3, "epoch")).is_err());
    assert!(h.get(&HistoryPath::key(-4, "epoch")).is_err());
}

#[test]
fn test_slice_skips_records_without_key() {
    let h = filled_history();
    let accs = h.get(&HistoryPath::key(.., "valid_acc")).unwrap();
    assert_eq!(accs, json!([0.25, 0.5]));
    assert!(h.get(&HistoryPath::key(.., "missing")).is_err());
}

#[test]
fn test_slice_bounds_clamp() {
    let h = filled_history();
    let path: HistoryPath = "1:,epoch".parse().unwrap();
    assert_eq!(h.get(&path).unwrap(), json!([2, 3]));
    let path: HistoryPath = ":-1,epoch".parse().unwrap();
    assert_eq!(h.get(&path).unwrap(), json!([1, 2]));
    let path: HistoryPath = "5:,epoch".parse().unwrap();
    assert_eq!(h.get(&path).unwrap(), json!([]));
}

#[test]
fn test_batch_paths() {
    let h = filled_history();
    assert_eq!(
        h.get(&HistoryPath::batch_key(-1, -1, "train_loss")).unwrap(),
        json!(21.0)
    );
    assert_eq!(
        h.get(&HistoryPath::batch_key(-1, .., "train_loss")).unwrap(),
        json!([20.0, 21.0])
    );
    assert_eq!(
        h.get(&HistoryPath::batch_key(.., 0, "train_loss")).unwrap(),
        json!([0.0, 10.0, 20.0])
    );
    assert_eq!(
        h.get(&":,batches,:,train_loss".parse().unwrap()).unwrap(),
        json!([[0.0, 1.0], [10.0, 11.0], [20.0, 21.0]])
    );
    assert!(h.get(&HistoryPath::batch_key(0, 5, "train_loss")).is_err());
}

#[test]
fn test_path_parse_errors() {
    assert!("x,train_loss".parse::<HistoryPath>().is_err());
    assert!("0,a,b".parse::<HistoryPath>().is_err());
    assert!("0,batches,x:y".parse::<HistoryPath>().is_err());
}

#[test]
fn test_path_display_round_trip() {
    for text in ["-1,train_loss", ":,valid_loss", "1:3", "-1,batches,:,train_loss", "0,batches,-2"] {
        let path: HistoryPath = text.parse().unwrap();
        assert_eq!(path.to_string(), text);
    }
}

#[test]
fn test_typed_helpers() {
    let h = filled_history();
    assert_eq!(h.last_f64("train_loss"), Some(2.0));
    assert_eq!(h.column_f64("valid_acc"), vec![0.25, 0.5]);
    assert_eq!(h.count_batches_with(-1, "train_loss"), 2);
    assert_eq!(h.count_batches_with(-1, "valid_loss"), 0);
}

#[test]
fn test_json_round_trip_through_file() {
    let h = filled_history();
    let file = tempfile::NamedTempFile::new().unwrap();
    h.save(file.path()).unwrap();
    let loaded = History::load(file.path()).unwrap();
    assert_eq!(loaded, h);
}

#[test]
fn test_json_round_trip_through_handle() {
    let h = filled_history();
    let mut buf = Vec::new();
    h.to_writer(&mut buf).unwrap();
    let loaded = History::from_reader(buf.as_slice()).unwrap();
    assert_eq!(loaded, h);
    assert_eq!(History::from_json(&h.to_json().unwrap()).unwrap(), h);
}

proptest! {
    #[test]
    fn history_round_trips(losses in prop::collection::vec(prop::collection::vec(-1e6f64..1e6, 0..4), 0..6)) {
        let mut h = History::new();
        for (i, batch_losses) in losses.iter().enumerate() {
            h.new_epoch();
            h.record("epoch", i + 1).unwrap();
            for loss in batch_losses {
                h.new_batch().unwrap();
                h.record_batch("train_loss", *loss).unwrap();
            }
        }
        let decoded = History::from_json(&h.to_json().unwrap()).unwrap();
        prop_assert_eq!(decoded, h);
    }
}
