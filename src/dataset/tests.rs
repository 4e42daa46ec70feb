use super::*;
use crate::params::{ParamValue, Params};
use ndarray::{Array1, Array2};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn labelled(n: usize) -> Dataset {
    let x = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f32);
    let y: Vec<usize> = (0..n).map(|i| usize::from(i % 4 == 0)).collect();
    Dataset::new(x, Some(y.into())).unwrap()
}

#[test]
fn test_length_mismatch_rejected() {
    let x = Array2::<f32>::zeros((4, 2));
    let y = Target::from(vec![0, 1, 0]);
    assert!(Dataset::new(x, Some(y)).is_err());
}

#[test]
fn test_default_factory_kwargs() {
    let x = Array2::<f32>::zeros((4, 2));
    let ok = Params::new().with("length", 4);
    assert_eq!(DefaultDatasetFactory.build(x.clone(), None, &ok).unwrap().len(), 4);
    let wrong = Params::new().with("length", 5);
    assert!(DefaultDatasetFactory.build(x.clone(), None, &wrong).is_err());
    let unknown = Params::new().with("foo", 1);
    assert!(DefaultDatasetFactory.build(x, None, &unknown).is_err());
}

#[test]
fn test_loader_batches_cover_dataset() {
    let ds = labelled(10);
    let mut rng = StdRng::seed_from_u64(0);
    let config = LoaderConfig { batch_size: Some(4), shuffle: false, drop_last: false };
    let loader = DataLoader::new(&ds, config, &mut rng);
    assert_eq!(loader.num_batches(), 3);
    let sizes: Vec<usize> = loader.map(|b| b.len()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn test_loader_drop_last_and_whole_batch() {
    let ds = labelled(10);
    let mut rng = StdRng::seed_from_u64(0);
    let config = LoaderConfig { batch_size: Some(4), shuffle: true, drop_last: true };
    assert_eq!(DataLoader::new(&ds, config, &mut rng).count(), 2);

    let config = LoaderConfig::from_params(-1, false, &Params::new()).unwrap();
    let batches: Vec<Batch> = DataLoader::new(&ds, config, &mut rng).collect();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].x, *ds.x());
}

#[test]
fn test_loader_config_from_params() {
    let kwargs = Params::new().with("batch_size", 32).with("shuffle", true);
    let config = LoaderConfig::from_params(128, false, &kwargs).unwrap();
    assert_eq!(config.batch_size, Some(32));
    assert!(config.shuffle);
    assert!(LoaderConfig::from_params(0, false, &Params::new()).is_err());
    assert!(LoaderConfig::from_params(8, false, &Params::new().with("workers", 2)).is_err());
}

#[test]
fn test_shuffle_is_permutation() {
    let ds = labelled(17);
    let mut rng = StdRng::seed_from_u64(3);
    let config = LoaderConfig { batch_size: Some(5), shuffle: true, drop_last: false };
    let mut firsts: Vec<f32> =
        DataLoader::new(&ds, config, &mut rng).flat_map(|b| b.x.column(0).to_vec()).collect();
    firsts.sort_by(f32::total_cmp);
    let expected: Vec<f32> = (0..17).map(|i| (i * 3) as f32).collect();
    assert_eq!(firsts, expected);
}

#[test]
fn test_cv_split_sizes() {
    let ds = labelled(1000);
    let (train, valid) = CVSplit::fraction(0.2).unwrap().split(&ds, true).unwrap();
    assert_eq!(train.len(), 800);
    assert_eq!(valid.len(), 200);
    let positives = valid.y().unwrap().classes().unwrap().iter().filter(|&&c| c == 1).count();
    assert_eq!(positives, 50);

    let (train, valid) = CVSplit::folds(3).unwrap().split(&labelled(10), false).unwrap();
    assert_eq!((train.len(), valid.len()), (6, 4));
}

#[test]
fn test_cv_split_deterministic() {
    let ds = labelled(50);
    let split = CVSplit::fraction(0.3).unwrap();
    assert_eq!(split.valid_indices(&ds, true).unwrap(), split.valid_indices(&ds, true).unwrap());
    let other = split.with_seed(1);
    assert_ne!(split.valid_indices(&ds, false).unwrap(), other.valid_indices(&ds, false).unwrap());
}

#[test]
fn test_cv_split_from_param() {
    assert_eq!(CVSplit::from_param(&ParamValue::Null).unwrap(), None);
    assert!(matches!(
        CVSplit::from_param(&ParamValue::Int(5)).unwrap(),
        Some(CVSplit::Folds { k: 5, .. })
    ));
    assert!(CVSplit::from_param(&ParamValue::Float(1.5)).is_err());
    assert!(CVSplit::from_param(&ParamValue::Int(1)).is_err());
    assert!(CVSplit::from_param(&ParamValue::from("yes")).is_err());
}

#[test]
fn test_target_helpers() {
    let y = Target::from(Array1::from(vec![2, 0, 1]));
    assert_eq!(y.n_classes(), Some(3));
    assert_eq!(y.select(&[2, 0]), Target::from(vec![1, 2]));
    let v = Target::from(Array2::<f32>::zeros((2, 1)));
    assert_eq!(v.n_classes(), None);
    assert!(y.concat(&v).is_err());
    assert_eq!(y.concat(&y).unwrap().len(), 6);
}

proptest! {
    #[test]
    fn split_partitions_samples(n in 5usize..200, fraction in 0.05f64..0.6) {
        let ds = labelled(n);
        let split = CVSplit::fraction(fraction).unwrap();
        let n_valid = (n as f64 * fraction).ceil() as usize;
        prop_assume!(n_valid < n);
        let (train, valid) = split.split(&ds, true).unwrap();
        prop_assert_eq!(valid.len(), n_valid);
        prop_assert_eq!(train.len() + valid.len(), n);
    }
}
