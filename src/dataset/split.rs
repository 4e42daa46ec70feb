use super::data::Dataset;
use crate::params::ParamValue;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Holds out a validation set: a fraction of the data or one of `k` folds
///
/// The validation size is `ceil(n * fraction)` (or `ceil(n / k)`); class
/// targets are stratified so each label keeps its share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CVSplit {
    Fraction { fraction: f64, seed: u64 },
    Folds { k: usize, seed: u64 },
}

impl CVSplit {
    pub fn fraction(fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::InvalidValue {
                key: "train_split".into(),
                reason: format!("fraction must be in (0, 1), got {fraction}"),
            });
        }
        Ok(CVSplit::Fraction { fraction, seed: 0 })
    }

    pub fn folds(k: usize) -> Result<Self> {
        if k < 2 {
            return Err(Error::InvalidValue {
                key: "train_split".into(),
                reason: format!("number of folds must be at least 2, got {k}"),
            });
        }
        Ok(CVSplit::Folds { k, seed: 0 })
    }

    /// Parse a `train_split` value: float fraction, int folds, or null (no split)
    pub fn from_param(value: &ParamValue) -> Result<Option<Self>> {
        match value {
            ParamValue::Null => Ok(None),
            ParamValue::Int(k) if *k >= 0 => Self::folds(*k as usize).map(Some),
            ParamValue::Float(f) => Self::fraction(*f).map(Some),
            other => Err(Error::InvalidValue {
                key: "train_split".into(),
                reason: format!("expected a fraction, a fold count or None, got {other}"),
            }),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        match self {
            CVSplit::Fraction { fraction, .. } => CVSplit::Fraction { fraction, seed },
            CVSplit::Folds { k, .. } => CVSplit::Folds { k, seed },
        }
    }

    fn seed(&self) -> u64 {
        match self {
            CVSplit::Fraction { seed, .. } | CVSplit::Folds { seed, .. } => *seed,
        }
    }

    fn n_valid(&self, n: usize) -> usize {
        match self {
            CVSplit::Fraction { fraction, .. } => (n as f64 * fraction).ceil() as usize,
            CVSplit::Folds { k, .. } => n.div_ceil(*k),
        }
    }

    /// Validation indices, sorted
    pub fn valid_indices(&self, dataset: &Dataset, stratified: bool) -> Result<Vec<usize>> {
        let n = dataset.len();
        let n_valid = self.n_valid(n);
        if n_valid == 0 || n_valid >= n {
            return Err(Error::InvalidValue {
                key: "train_split".into(),
                reason: format!("cannot hold out {n_valid} of {n} samples"),
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed());
        let classes = dataset.y().and_then(|y| y.classes()).filter(|_| stratified);
        let mut picked = match classes {
            None => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut rng);
                order.truncate(n_valid);
                order
            }
            Some(labels) => {
                let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
                for (i, &label) in labels.iter().enumerate() {
                    by_class.entry(label).or_default().push(i);
                }
                let quotas = allocate(&by_class, n, n_valid);
                let mut picked = Vec::with_capacity(n_valid);
                for (members, quota) in by_class.values_mut().zip(quotas) {
                    members.shuffle(&mut rng);
                    picked.extend_from_slice(&members[..quota]);
                }
                picked
            }
        };
        picked.sort_unstable();
        Ok(picked)
    }

    /// `(train, valid)` datasets
    pub fn split(&self, dataset: &Dataset, stratified: bool) -> Result<(Dataset, Dataset)> {
        let valid = self.valid_indices(dataset, stratified)?;
        let mut is_valid = vec![false; dataset.len()];
        for &i in &valid {
            is_valid[i] = true;
        }
        let train: Vec<usize> = (0..dataset.len()).filter(|&i| !is_valid[i]).collect();
        Ok((dataset.subset(&train), dataset.subset(&valid)))
    }
}

/// Per-class validation counts summing to `n_valid` (largest remainder)
fn allocate(by_class: &BTreeMap<usize, Vec<usize>>, n: usize, n_valid: usize) -> Vec<usize> {
    let exact: Vec<f64> =
        by_class.values().map(|m| m.len() as f64 * n_valid as f64 / n as f64).collect();
    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });
    let mut missing = n_valid.saturating_sub(quotas.iter().sum::<usize>());
    for i in order {
        if missing == 0 {
            break;
        }
        let capacity = by_class.values().nth(i).map_or(0, Vec::len);
        if quotas[i] < capacity {
            quotas[i] += 1;
            missing -= 1;
        }
    }
    quotas
}
