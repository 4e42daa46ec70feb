use super::*;
use crate::dataset::{Dataset, Target};
use crate::model_selection::{GridSearchCV, KFold, ParamGrid};
use crate::module::MlpFactory;
use crate::net::NeuralNetClassifier;
use crate::params::{ParamValue, Params};
use crate::Error;
use ndarray::{array, Array, Array2, ArrayD, IxDyn, Slice};

fn arange(n: usize) -> ArrayD<f32> {
    Array::from_iter((0..n).map(|i| i as f32)).into_dyn()
}

fn sldict() -> SliceDict {
    let f1 = arange(12).into_shape_with_order(IxDyn(&[4, 3])).unwrap();
    SliceDict::from_arrays([("f0", arange(4)), ("f1", f1)]).unwrap()
}

fn ones(shape: &[usize]) -> ArrayD<f32> {
    ArrayD::ones(IxDyn(shape))
}

#[test]
fn test_init_inconsistent_lengths() {
    let err = SliceDict::from_arrays([("f0", ones(&[10, 5])), ("f1", ones(&[11, 5]))]).unwrap_err();
    assert_eq!(err.to_string(), "Initialized with items of different lengths: 10, 11");
}

#[test]
fn test_insert_accepts_matching_rows() {
    for shape in [&[4][..], &[4, 1], &[4, 4], &[4, 10, 7], &[4, 1, 28, 28]] {
        let mut dict = sldict();
        dict.insert("f2", ones(shape)).unwrap();
        assert_eq!(dict.get("f2").unwrap().shape(), shape);
    }
}

#[test]
fn test_insert_rejects_other_row_count() {
    for shape in [&[3][..], &[1, 100], &[5, 1000], &[1, 100, 10], &[28, 28, 1, 100]] {
        let err = sldict().insert("f2", ones(shape)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot set array with shape[0] != 4");
    }
    let err = sldict().insert("f2", ArrayD::from_elem(IxDyn(&[]), 1.0)).unwrap_err();
    assert!(matches!(err, Error::SliceDict(_)));
}

#[test]
fn test_len_and_shape() {
    let cases: Vec<(Vec<(&str, ArrayD<f32>)>, usize)> = vec![
        (vec![], 0),
        (vec![("a", ones(&[12]))], 12),
        (vec![("a", ones(&[12])), ("b", ones(&[12, 5]))], 12),
        (vec![("a", ones(&[10, 1, 1])), ("b", ones(&[10, 10])), ("c", ones(&[10]))], 10),
    ];
    for (arrays, expected) in cases {
        let dict = SliceDict::from_arrays(arrays).unwrap();
        assert_eq!(dict.len(), expected);
        assert_eq!(dict.shape(), [expected]);
    }
}

#[test]
fn test_get_by_key() {
    let dict = SliceDict::from_arrays([("a", ones(&[5])), ("b", ArrayD::zeros(IxDyn(&[5])))]).unwrap();
    assert_eq!(dict.get("a").unwrap(), &ones(&[5]));
    assert!(dict.get("b").unwrap().iter().all(|&v| v == 0.0));
    assert!(dict.get("c").is_none());
}

#[test]
fn test_slice_rows() {
    let dict = sldict();
    let first = dict.slice(0..1);
    assert_eq!(first.get("f0").unwrap(), &array![0.0f32].into_dyn());
    assert_eq!(first.get("f1").unwrap(), &array![[0.0f32, 1.0, 2.0]].into_dyn());

    let middle = dict.slice(1..2);
    assert_eq!(middle.get("f1").unwrap(), &array![[3.0f32, 4.0, 5.0]].into_dyn());

    assert_eq!(dict.slice(0..), dict);

    let last = dict.slice(-1..);
    assert_eq!(last.get("f0").unwrap(), &array![3.0f32].into_dyn());
    assert_eq!(last.get("f1").unwrap(), &array![[9.0f32, 10.0, 11.0]].into_dyn());

    let reversed = dict.slice(Slice::new(0, None, -1));
    assert_eq!(reversed.get("f0").unwrap(), &array![3.0f32, 2.0, 1.0, 0.0].into_dyn());
    assert_eq!(reversed.len(), 4);
}

#[test]
fn test_select_and_mask_rows() {
    let dict = sldict();
    let expected = SliceDict::from_arrays([
        ("f0", array![0.0f32, 2.0].into_dyn()),
        ("f1", array![[0.0f32, 1.0, 2.0], [6.0, 7.0, 8.0]].into_dyn()),
    ])
    .unwrap();
    assert_eq!(dict.select(&[0, 2]), expected);
    assert_eq!(dict.mask(&[true, false, true, false]).unwrap(), expected);
    assert!(matches!(dict.mask(&[true]), Err(Error::SliceDict(_))));
}

#[test]
fn test_len_of_sliced() {
    let dict = sldict();
    assert_eq!(dict.len(), 4);
    for i in 1..4 {
        assert_eq!(dict.slice(0..i).len(), i);
    }
}

#[test]
fn test_keys_keep_insertion_order() {
    let dict = sldict();
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["f0", "f1"]);
    assert_eq!(dict.to_string(), "SliceDict(f0=[4], f1=[4, 3])");
}

#[test]
fn test_to_matrix_joins_columns() {
    let matrix = sldict().to_matrix().unwrap();
    assert_eq!(matrix.dim(), (4, 4));
    assert_eq!(matrix.row(1).to_vec(), vec![1.0, 3.0, 4.0, 5.0]);
    assert!(matches!(SliceDict::new().to_matrix(), Err(Error::SliceDict(_))));
}

#[test]
fn test_dataset_from_slice_dict() {
    let y = Target::from(vec![0, 1, 0, 1]);
    let dataset = Dataset::from_slice_dict(&sldict(), Some(y)).unwrap();
    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.n_features(), 4);
}

#[test]
fn test_grid_search_over_slice_dict() {
    let n = 60;
    let x = Array2::from_shape_fn((n, 3), |(i, j)| {
        let center = if i % 2 == 0 { -1.0 } else { 1.0 };
        center + ((i * 3 + j * 5) % 7) as f32 / 20.0
    });
    let y = Target::from((0..n).map(|i| i % 2).collect::<Vec<usize>>());
    let dict = SliceDict::from_arrays([("X", x.clone().into_dyn())]).unwrap();

    let params = Params::new().with("verbose", 0).with("train_split", ParamValue::Null);
    let net = NeuralNetClassifier::new(MlpFactory::classifier(3, 2), params).unwrap();
    let grid = ParamGrid::new().add("lr", [0.01, 0.02]).add("max_epochs", [2usize, 4]);
    let mut search = GridSearchCV::new(Box::new(net), grid).with_cv(KFold::new(3).stratified(true));
    search.fit(&dict, &y).unwrap();

    assert_eq!(search.cv_results().len(), 4);
    assert!(search.best_params().is_some());
    assert_eq!(search.predict(&dict).unwrap(), search.predict(&x).unwrap());
}
