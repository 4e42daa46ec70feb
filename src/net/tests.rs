use super::*;
use crate::callbacks::{BatchContext, Callback, CallbackAction, EarlyStopping, EpochContext, PrintLog, Sink};
use crate::dataset::{Dataset, Target};
use crate::device::Device;
use crate::lr_scheduler::{LRScheduler, Policy};
use crate::module::{Mlp, MlpConfig, MlpFactory};
use crate::params::{ParamValue, Params};
use crate::Error;
use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn classification_data(n: usize) -> (Array2<f32>, Target) {
    let x = Array2::from_shape_fn((n, 4), |(i, j)| ((i * 7 + j * 3) % 11) as f32 / 11.0 - 0.5);
    let y: Vec<usize> = (0..n).map(|i| usize::from(x[[i, 0]] + x[[i, 1]] > 0.0)).collect();
    (x, Target::from(y))
}

fn regression_data(n: usize) -> (Array2<f32>, Target) {
    let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * 5 + j) % 13) as f32 / 13.0);
    let y = Array2::from_shape_fn((n, 1), |(i, _)| 2.0 * x[[i, 0]] - x[[i, 2]]);
    (x, Target::Values(y))
}

fn quiet() -> Params {
    Params::new().with("verbose", 0).with("max_epochs", 2)
}

fn classifier(params: Params) -> NeuralNetClassifier {
    NeuralNetClassifier::new(MlpFactory::classifier(4, 2), params).unwrap()
}

#[derive(Clone, Default)]
struct Counter {
    counts: Arc<Mutex<BTreeMap<&'static str, usize>>>,
}

impl Counter {
    fn bump(&self, hook: &'static str) {
        *self.counts.lock().unwrap().entry(hook).or_default() += 1;
    }

    fn get(&self, hook: &str) -> usize {
        self.counts.lock().unwrap().get(hook).copied().unwrap_or(0)
    }
}

impl Callback for Counter {
    fn on_train_begin(&mut self, _: &mut NeuralNet, _: &EpochContext<'_>) -> crate::Result<CallbackAction> {
        self.bump("train_begin");
        Ok(CallbackAction::Continue)
    }

    fn on_train_end(&mut self, _: &mut NeuralNet, _: &EpochContext<'_>) -> crate::Result<()> {
        self.bump("train_end");
        Ok(())
    }

    fn on_epoch_begin(&mut self, _: &mut NeuralNet, _: &EpochContext<'_>) -> crate::Result<CallbackAction> {
        self.bump("epoch_begin");
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, _: &mut NeuralNet, _: &EpochContext<'_>) -> crate::Result<CallbackAction> {
        self.bump("epoch_end");
        Ok(CallbackAction::Continue)
    }

    fn on_batch_begin(&mut self, _: &mut NeuralNet, batch: &BatchContext<'_>) -> crate::Result<CallbackAction> {
        self.bump(if batch.training { "train_batch_begin" } else { "valid_batch_begin" });
        Ok(CallbackAction::Continue)
    }

    fn on_batch_end(&mut self, _: &mut NeuralNet, batch: &BatchContext<'_>) -> crate::Result<CallbackAction> {
        assert!(batch.y_pred.is_some());
        assert!(batch.loss.is_some());
        self.bump("batch_end");
        Ok(CallbackAction::Continue)
    }

    fn type_name(&self) -> &str {
        "Counter"
    }
}

#[test]
fn test_unknown_arguments_are_reported_together() {
    let params = Params::new().with("mxa_epochs", 3).with("bathc_size", 4).with("lr", 0.1);
    let err = NeuralNet::new(MlpFactory::regressor(3, 1), params).unwrap_err();
    match &err {
        Error::UnknownArguments(keys) => {
            assert_eq!(keys.len(), 2);
            assert!(keys.contains(&"mxa_epochs".to_string()));
            assert!(keys.contains(&"bathc_size".to_string()));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("Either you made a typo"));
}

#[test]
fn test_routed_keys_are_accepted() {
    let params = quiet()
        .with("module__num_units", 7)
        .with("optimizer__momentum", 0.9)
        .with("iterator_train__shuffle", false)
        .with("callbacks__print_log__sink", "none");
    assert!(NeuralNet::new(MlpFactory::regressor(3, 1), params).is_ok());
}

#[test]
fn test_set_params_rejects_unknown_key() {
    let mut net = classifier(quiet());
    let err = net.set_params(&Params::new().with("max_epoch", 3)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid parameter max_epoch for estimator NeuralNetClassifier. Check the list of available \
         parameters with `get_params()`."
    );
}

#[test]
fn test_get_params_contains_defaults_and_components() {
    let net = classifier(quiet().with("module__num_units", 7));
    let params = net.get_params();
    assert_eq!(params.get("max_epochs"), Some(&ParamValue::Int(2)));
    assert_eq!(params.get("lr"), Some(&ParamValue::Float(0.01)));
    assert_eq!(params.get("batch_size"), Some(&ParamValue::Int(128)));
    assert_eq!(params.get("module__num_units"), Some(&ParamValue::Int(7)));
    assert_eq!(params.get("criterion").and_then(ParamValue::as_str), Some("NLLLoss"));
    assert_eq!(params.get("optimizer").and_then(ParamValue::as_str), Some("SGD"));
    assert!(params.contains_key("callbacks__print_log__sink"));
}

#[test]
fn test_display_shows_state_and_params() {
    let mut net = classifier(quiet().with("module__num_units", 7));
    let text = net.to_string();
    assert!(text.starts_with("<NeuralNetClassifier>[uninitialized]("));
    assert!(text.contains("  module=Mlp,"));
    assert!(text.contains("  module__num_units=7,"));
    net.initialize().unwrap();
    let text = net.to_string();
    assert!(text.contains("[initialized]("));
    assert!(text.contains("  module_=Mlp("));
}

#[test]
fn test_fit_records_history_per_epoch() {
    let (x, y) = classification_data(100);
    let mut net = classifier(quiet().with("max_epochs", 3).with("lr", 0.1));
    net.fit(&x, &y).unwrap();

    let history = net.history();
    assert_eq!(history.len(), 3);
    for (i, record) in history.iter().enumerate() {
        assert_eq!(record.get("epoch").and_then(|v| v.as_u64()), Some(i as u64 + 1));
        for key in ["train_loss", "valid_loss", "valid_acc", "dur"] {
            assert!(record.contains_key(key), "missing {key}");
        }
    }
    assert!(history.last_f64("train_loss").unwrap().is_finite());
    let acc = history.last_f64("valid_acc").unwrap();
    assert!((0.0..=1.0).contains(&acc));
}

#[test]
fn test_hooks_fire_per_batch_and_epoch() {
    let (x, y) = classification_data(1000);
    let counter = Counter::default();
    let mut net = classifier(quiet().with("max_epochs", 3)).with_callback("counter", counter.clone());
    net.fit(&x, &y).unwrap();

    // 800 training rows in batches of 128 -> 7, 200 validation rows -> 2
    assert_eq!(counter.get("train_begin"), 1);
    assert_eq!(counter.get("train_end"), 1);
    assert_eq!(counter.get("epoch_begin"), 3);
    assert_eq!(counter.get("epoch_end"), 3);
    assert_eq!(counter.get("train_batch_begin"), 21);
    assert_eq!(counter.get("valid_batch_begin"), 6);
    assert_eq!(counter.get("batch_end"), 27);
    assert_eq!(net.history().count_batches_with(-1, "train_loss"), 7);
    assert_eq!(net.history().count_batches_with(-1, "valid_loss"), 2);
}

#[test]
fn test_warm_start_with_zero_epochs_keeps_weights() {
    let (x, y) = classification_data(60);
    let mut net = classifier(quiet());
    net.fit(&x, &y).unwrap();
    let before = net.module().unwrap().state_dict();

    net.set_params(&Params::new().with("warm_start", true).with("max_epochs", 0)).unwrap();
    net.fit(&x, &y).unwrap();
    assert_eq!(net.module().unwrap().state_dict(), before);
    assert_eq!(net.history().len(), 2);
}

#[test]
fn test_fit_without_warm_start_reinitializes() {
    let (x, y) = classification_data(60);
    let mut net = classifier(quiet().with("max_epochs", 0));
    net.fit(&x, &y).unwrap();
    let first = net.module().unwrap().state_dict();
    net.fit(&x, &y).unwrap();
    assert_ne!(net.module().unwrap().state_dict(), first);

    net.set_params(&Params::new().with("max_epochs", 2)).unwrap();
    net.fit(&x, &y).unwrap();
    net.fit(&x, &y).unwrap();
    assert_eq!(net.history().len(), 2);
}

#[test]
fn test_partial_fit_continues_history() {
    let (x, y) = classification_data(60);
    let mut net = classifier(quiet());
    net.partial_fit(&x, &y).unwrap();
    net.partial_fit(&x, &y).unwrap();
    assert_eq!(net.history().len(), 4);
    let epochs: Vec<f64> = net.history().column_f64("epoch");
    assert_eq!(epochs, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_classifier_rejects_real_targets() {
    let (x, _) = classification_data(20);
    let (_, y) = regression_data(20);
    let mut net = classifier(quiet());
    assert!(matches!(net.fit(&x, &y), Err(Error::InvalidValue { .. })));
}

#[test]
fn test_predictions_have_expected_shapes() {
    let (x, y) = classification_data(50);
    let mut net = classifier(quiet().with("batch_size", 16));
    net.fit(&x, &y).unwrap();

    let proba = net.predict_proba(&x).unwrap();
    assert_eq!(proba.dim(), (50, 2));
    for row in proba.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
    }
    let labels: Array1<usize> = net.predict(&x).unwrap();
    assert_eq!(labels.len(), 50);
    assert!(labels.iter().all(|&c| c < 2));
    let score = net.score(&x, &y).unwrap();
    assert!((0.0..=1.0).contains(&score));
}

#[test]
fn test_predict_before_initialize_fails() {
    let (x, _) = classification_data(10);
    let mut net = classifier(quiet());
    assert!(matches!(net.predict_proba(&x), Err(Error::NotInitialized(_))));
}

#[test]
fn test_regressor_fits_and_scores() {
    let (x, y) = regression_data(80);
    let params = quiet().with("max_epochs", 5).with("lr", 0.05);
    let mut net = NeuralNetRegressor::new(MlpFactory::regressor(3, 1), params).unwrap();
    net.fit(&x, &y).unwrap();
    assert_eq!(net.criterion().unwrap().name(), "MSELoss");
    assert!(!net.history().epoch(-1).unwrap().contains_key("valid_acc"));
    assert_eq!(net.predict(&x).unwrap().dim(), (80, 1));
    assert!(net.score(&x, &y).unwrap().is_finite());
}

#[test]
fn test_duplicate_callback_names_fail_on_initialize() {
    let mut net = classifier(quiet()).with_callback("epoch_timer", PrintLog::new());
    assert!(matches!(net.initialize(), Err(Error::DuplicateCallbackName(name)) if name == "epoch_timer"));
}

#[test]
fn test_disabled_callback_is_skipped() {
    let (x, y) = classification_data(40);
    let mut net = classifier(quiet().with("callbacks__epoch_timer", ParamValue::Null));
    net.fit(&x, &y).unwrap();
    assert!(!net.history().epoch(-1).unwrap().contains_key("dur"));
    assert!(net.callbacks().is_disabled("epoch_timer"));
}

#[test]
fn test_params_of_disabled_callback_are_rejected() {
    let params = quiet()
        .with("callbacks__print_log", ParamValue::Null)
        .with("callbacks__print_log__sink", "none");
    let mut net = classifier(params);
    assert!(matches!(net.initialize(), Err(Error::CallbackNotFound(name)) if name == "print_log"));

    let mut net = classifier(quiet());
    net.set_params(&Params::new().with("callbacks__print_log", ParamValue::Null)).unwrap();
    let err = net.set_params(&Params::new().with("callbacks__print_log__sink", "none")).unwrap_err();
    assert!(matches!(err, Error::CallbackNotFound(_)));
}

#[test]
fn test_disabling_callback_drops_its_params() {
    let mut net = classifier(quiet());
    net.set_params(&Params::new().with("callbacks__print_log__sink", "none")).unwrap();
    net.set_params(&Params::new().with("callbacks__print_log", ParamValue::Null)).unwrap();
    net.initialize().unwrap();
    assert!(net.callbacks().is_disabled("print_log"));
}

#[test]
fn test_set_params_keeps_slot_params_given_alongside() {
    let mapping = Params::new().with("callbacks__es__patience", 2).with("callbacks__es", "EarlyStopping");
    let from_ctor = classifier(quiet().with("callbacks__es__patience", 2).with("callbacks__es", "EarlyStopping"));

    let mut via_set = classifier(quiet());
    via_set.set_params(&mapping).unwrap();

    let expected = Some(&ParamValue::Int(2));
    assert_eq!(from_ctor.get_params().get("callbacks__es__patience"), expected);
    assert_eq!(via_set.get_params().get("callbacks__es__patience"), expected);

    // a later slot value still resets the slot
    via_set.set_params(&Params::new().with("callbacks__es", "EarlyStopping")).unwrap();
    assert_eq!(via_set.get_params().get("callbacks__es__patience"), Some(&ParamValue::Int(5)));
}

#[test]
fn test_set_callback_replaces_slot() {
    let (x, y) = classification_data(40);
    let (sink, buffer) = Sink::buffer();
    let mut net = classifier(quiet().with("verbose", 1));
    net.set_callback("print_log", Some(Box::new(PrintLog::with_sink(sink)))).unwrap();
    net.fit(&x, &y).unwrap();
    let output = buffer.lock().unwrap().clone();
    assert!(output.contains("epoch"));
    assert!(output.contains("train_loss"));
}

#[test]
fn test_early_stopping_ends_training() {
    let (x, y) = classification_data(40);
    let counter = Counter::default();
    let mut net = classifier(quiet().with("max_epochs", 10))
        .with_callback("early", EarlyStopping::new("epoch", 2))
        .with_callback("counter", counter.clone());
    net.fit(&x, &y).unwrap();
    assert_eq!(net.history().len(), 3);
    assert_eq!(counter.get("train_end"), 1);
}

#[test]
fn test_set_lr_updates_optimizer() {
    let mut net = classifier(quiet());
    net.initialize().unwrap();
    net.set_params(&Params::new().with("lr", 0.3)).unwrap();
    assert_abs_diff_eq!(net.optimizer().unwrap().lr(), 0.3);
}

#[test]
fn test_set_module_params_rebuilds_module() {
    let mut net = classifier(quiet());
    net.initialize().unwrap();
    net.set_params(&Params::new().with("module__num_units", 5)).unwrap();
    let state = net.module().unwrap().state_dict();
    assert_eq!(state.get("dense0.weight").unwrap().shape(), &[5, 4]);
}

#[test]
fn test_module_instance_is_reinitialized_with_kwargs() {
    let module = Mlp::new(MlpConfig::new(4, 2), 1);
    let mut net =
        NeuralNetClassifier::from_module(Box::new(module), quiet().with("module__num_units", 3)).unwrap();
    net.initialize().unwrap();
    let state = net.module().unwrap().state_dict();
    assert_eq!(state.get("dense0.weight").unwrap().shape(), &[3, 4]);
}

#[test]
fn test_optimizer_param_groups() {
    let fast = BTreeMap::from([("lr".to_string(), ParamValue::Float(0.5))]);
    let groups = ParamValue::List(vec![ParamValue::List(vec!["output.*".into(), ParamValue::Map(fast)])]);
    let mut net = classifier(quiet().with("optimizer__param_groups", groups));
    net.initialize().unwrap();
    let groups = net.optimizer().unwrap().param_groups();
    assert_eq!(groups.len(), 2);
    assert_abs_diff_eq!(groups[0].lr, 0.5);
    assert_abs_diff_eq!(groups[1].lr, 0.01);
}

#[test]
fn test_named_optimizer_and_criterion() {
    let mut net = classifier(quiet().with("optimizer", "adam").with("criterion", "CrossEntropyLoss"));
    net.initialize().unwrap();
    assert_eq!(net.optimizer().unwrap().name(), "Adam");
    assert_eq!(net.criterion().unwrap().name(), "CrossEntropyLoss");
}

#[test]
fn test_dataset_arguments_conflict_with_dataset() {
    let (x, y) = classification_data(20);
    let mut net = classifier(quiet().with("dataset__length", 20));
    let dataset = Dataset::new(x, Some(y)).unwrap();
    let err = net.fit_dataset(dataset).unwrap_err();
    assert!(matches!(err, Error::DatasetArguments(_)));
    assert!(err.to_string().contains("dataset__length"));
}

#[test]
fn test_fit_without_split_has_no_valid_loss() {
    let (x, y) = classification_data(30);
    let mut net = classifier(quiet().with("train_split", ParamValue::Null));
    net.fit(&x, &y).unwrap();
    let record = net.history().epoch(-1).unwrap();
    assert!(record.contains_key("train_loss"));
    assert!(!record.contains_key("valid_loss"));
}

#[test]
fn test_unavailable_device_falls_back_to_cpu() {
    let mut net = classifier(quiet().with("device", "cuda:1"));
    assert_eq!(net.config().device, Device::Cuda(1));
    net.initialize().unwrap();
    assert_eq!(net.device(), Device::Cpu);
}

#[test]
fn test_save_and_load_require_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.safetensors");
    let mut net = classifier(quiet());
    let err = net.save_params(&path).unwrap_err();
    assert!(err.to_string().starts_with("Cannot save parameters of an un-initialized model"));
    let err = net.load_params(&path).unwrap_err();
    assert!(err.to_string().starts_with("Cannot load parameters of an un-initialized model"));
}

#[test]
fn test_save_load_params_roundtrip() {
    let (x, y) = classification_data(60);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.safetensors");

    let mut trained = classifier(quiet());
    trained.fit(&x, &y).unwrap();
    trained.save_params(&path).unwrap();
    let expected = trained.predict_proba(&x).unwrap();

    let mut restored = classifier(quiet().with("seed", 42));
    restored.initialize().unwrap();
    restored.load_params(&path).unwrap();
    assert_eq!(restored.module().unwrap().state_dict(), trained.module().unwrap().state_dict());
    let got = restored.predict_proba(&x).unwrap();
    for (a, b) in got.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-6);
    }
}

fn with_device_metadata(bytes: &[u8], device: &str) -> Vec<u8> {
    let tensors = safetensors::SafeTensors::deserialize(bytes).unwrap();
    let metadata = std::collections::HashMap::from([("device".to_string(), device.to_string())]);
    safetensors::serialize(tensors.tensors(), Some(metadata)).unwrap()
}

#[test]
fn test_load_params_saved_on_unavailable_device_falls_back_to_cpu() {
    let (x, y) = classification_data(30);
    let mut trained = classifier(quiet());
    trained.fit(&x, &y).unwrap();
    let mut bytes = Vec::new();
    trained.save_params_to(&mut bytes).unwrap();

    for device in ["cuda:1", "mps"] {
        let saved = with_device_metadata(&bytes, device);
        let mut restored = classifier(quiet().with("seed", 9));
        restored.initialize().unwrap();
        restored.load_params_from(saved.as_slice()).unwrap();
        assert_eq!(restored.device(), Device::Cpu);
        assert_eq!(restored.module().unwrap().state_dict(), trained.module().unwrap().state_dict());
    }
}

#[test]
fn test_load_params_rejects_other_architecture() {
    let (x, y) = classification_data(30);
    let mut trained = classifier(quiet());
    trained.fit(&x, &y).unwrap();
    let mut bytes = Vec::new();
    trained.save_params_to(&mut bytes).unwrap();

    let mut other = classifier(quiet().with("module__num_units", 3));
    other.initialize().unwrap();
    assert!(other.load_params_from(bytes.as_slice()).is_err());
}

#[test]
fn test_history_save_load_roundtrip() {
    let (x, y) = classification_data(30);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let mut net = classifier(quiet());
    net.fit(&x, &y).unwrap();
    net.save_history(&path).unwrap();

    let mut other = classifier(quiet());
    other.load_history(&path).unwrap();
    assert_eq!(other.history(), net.history());
}

#[test]
fn test_cyclic_scheduler_continues_across_partial_fit() {
    let (x, y) = classification_data(100);
    let kwargs = Params::new().with("base_lr", 0.01).with("max_lr", 0.05).with("step_size", 4.0);
    let mut net = classifier(quiet().with("max_epochs", 1).with("batch_size", 10).with("train_split", ParamValue::Null))
        .with_callback("scheduler", LRScheduler::new(Policy::CyclicLR, kwargs));

    // 10 batches per epoch; the last applied index is 9, then 19
    net.partial_fit(&x, &y).unwrap();
    assert_abs_diff_eq!(net.optimizer().unwrap().lr(), 0.02, epsilon = 1e-9);
    net.partial_fit(&x, &y).unwrap();
    assert_abs_diff_eq!(net.optimizer().unwrap().lr(), 0.04, epsilon = 1e-9);
}

#[test]
fn test_cyclic_scheduler_ignores_validation_batches() {
    let (x, y) = classification_data(110);
    let kwargs = Params::new().with("base_lr", 0.01).with("max_lr", 0.05).with("step_size", 4.0);
    let mut net = classifier(quiet().with("max_epochs", 1).with("batch_size", 10))
        .with_callback("scheduler", LRScheduler::new(Policy::CyclicLR, kwargs));
    net.fit(&x, &y).unwrap();

    // 9 training batches: last index 8 sits at the base of the second cycle
    assert_eq!(net.history().count_batches_with(-1, "train_loss"), 9);
    assert!(net.history().count_batches_with(-1, "valid_loss") > 0);
    assert_abs_diff_eq!(net.optimizer().unwrap().lr(), 0.01, epsilon = 1e-9);
}

#[test]
fn test_warm_restart_scheduler_steps_per_epoch() {
    let (x, y) = classification_data(40);
    let kwargs = Params::new().with("min_lr", 0.001).with("max_lr", 0.1).with("base_period", 2.0);
    let mut net = classifier(quiet())
        .with_callback("scheduler", LRScheduler::new(Policy::WarmRestartLR, kwargs));
    net.fit(&x, &y).unwrap();
    assert_abs_diff_eq!(net.optimizer().unwrap().lr(), 0.0505, epsilon = 1e-9);
}

#[test]
fn test_scheduler_params_are_routed() {
    let mut net = classifier(quiet()).with_callback("scheduler", LRScheduler::default());
    net.set_params(&Params::new().with("callbacks__scheduler__policy", "CyclicLR")).unwrap();
    assert_eq!(
        net.get_params().get("callbacks__scheduler__policy").and_then(ParamValue::as_str),
        Some("CyclicLR")
    );
    assert!(net.set_params(&Params::new().with("callbacks__scheduler__policy", "Step")).is_err());
}

#[test]
fn test_clone_is_independent() {
    let (x, y) = classification_data(40);
    let mut net = classifier(quiet());
    net.fit(&x, &y).unwrap();
    let copy = net.clone();
    net.partial_fit(&x, &y).unwrap();
    assert_eq!(copy.history().len(), 2);
    assert_eq!(net.history().len(), 4);
}
