//! End-to-end estimator workflows through the public API

use ndarray::Array2;
use skorch::callbacks::EarlyStopping;
use skorch::dataset::Target;
use skorch::history::HistoryPath;
use skorch::model_selection::{Estimator, GridSearchCV, KFold, ParamGrid, Pipeline, StandardScaler, Transformer};
use skorch::module::MlpFactory;
use skorch::{NeuralNetClassifier, NeuralNetRegressor, ParamValue, Params};
use tempfile::TempDir;

fn blobs(n: usize) -> (Array2<f32>, Target) {
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        let center = if i % 2 == 0 { -1.0 } else { 1.0 };
        center + 0.1 * ((i * 7 + j * 3) % 5) as f32
    });
    (x, Target::from((0..n).map(|i| i % 2).collect::<Vec<usize>>()))
}

fn quiet(epochs: usize) -> Params {
    Params::new().with("verbose", 0).with("max_epochs", epochs).with("lr", 0.2)
}

#[test]
fn test_classifier_learns_separable_data() {
    let (x, y) = blobs(80);
    let mut net = NeuralNetClassifier::new(MlpFactory::classifier(2, 2), quiet(30).with("batch_size", 16)).unwrap();
    net.fit(&x, &y).unwrap();

    let losses = net.history().column_f64("train_loss");
    assert_eq!(losses.len(), 30);
    assert!(losses[29] < losses[0]);
    let acc: f64 = net.history().get(&"-1,valid_acc".parse::<HistoryPath>().unwrap()).unwrap().as_f64().unwrap();
    assert!(acc > 0.8, "valid_acc {acc}");
}

#[test]
fn test_early_stopping_through_set_params() {
    let (x, y) = blobs(40);
    let mut net = NeuralNetClassifier::new(MlpFactory::classifier(2, 2), quiet(50))
        .unwrap()
        .with_callback("stopper", EarlyStopping::default());
    net.set_params(&Params::new().with("callbacks__stopper__patience", 1).with("lr", 1e-9)).unwrap();
    net.fit(&x, &y).unwrap();
    assert!(net.history().len() < 50);
}

#[test]
fn test_save_and_load_params_between_nets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weights.safetensors");
    let (x, y) = blobs(40);

    let mut trained = NeuralNetClassifier::new(MlpFactory::classifier(2, 2), quiet(5)).unwrap();
    trained.fit(&x, &y).unwrap();
    trained.save_params(&path).unwrap();

    let mut fresh = NeuralNetClassifier::new(MlpFactory::classifier(2, 2), quiet(5).with("seed", 7)).unwrap();
    fresh.initialize().unwrap();
    fresh.load_params(&path).unwrap();
    assert_eq!(trained.predict_proba(&x).unwrap(), fresh.predict_proba(&x).unwrap());
}

#[test]
fn test_grid_search_over_pipeline() {
    let (x, y) = blobs(60);
    let net = NeuralNetClassifier::new(MlpFactory::classifier(2, 2), quiet(5).with("train_split", ParamValue::Null)).unwrap();
    let pipeline = Pipeline::new(
        vec![("scale".to_string(), Box::new(StandardScaler::default()) as Box<dyn Transformer>)],
        "net",
        Box::new(net),
    )
    .unwrap();
    let grid = ParamGrid::new().add("net__lr", [0.01, 0.3]).add("net__max_epochs", [2usize, 4]);

    let mut search = GridSearchCV::new(Box::new(pipeline), grid).with_cv(KFold::new(3).stratified(true));
    search.fit(&x, &y).unwrap();

    assert_eq!(search.cv_results().len(), 4);
    assert!(search.cv_results().iter().all(|r| r.fold_scores.len() == 3));
    let best = search.best_score().unwrap();
    assert!(search.cv_results().iter().all(|r| r.mean_score <= best));
    assert_eq!(search.predict(&x).unwrap().dim(), (60, 2));
}

#[test]
fn test_regressor_score_improves() {
    let x = Array2::from_shape_fn((50, 1), |(i, _)| i as f32 / 50.0);
    let y = Target::from(x.mapv(|v| 2.0 * v + 0.5));
    let mut net = NeuralNetRegressor::new(MlpFactory::regressor(1, 1), quiet(40).with("train_split", ParamValue::Null).with("lr", 0.1).with("batch_size", 5)).unwrap();
    net.fit(&x, &y).unwrap();
    let score = Estimator::score(&mut net, &x, &y).unwrap();
    assert!(score > 0.5, "r2 {score}");
}
