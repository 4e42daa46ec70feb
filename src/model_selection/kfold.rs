//! K-fold cross-validation splits

use crate::dataset::Target;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// One train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter
///
/// Every sample lands in exactly one test fold; fold sizes differ by at
/// most one. With `stratified` each class is dealt across the folds in
/// turn so class proportions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub stratified: bool,
    pub seed: u64,
}

impl Default for KFold {
    fn default() -> Self {
        Self { n_splits: 5, shuffle: false, stratified: false, seed: 0 }
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits, ..Self::default() }
    }

    pub fn stratified(mut self, stratified: bool) -> Self {
        self.stratified = stratified;
        self
    }

    pub fn shuffled(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn split(&self, n_samples: usize, y: Option<&Target>) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(Error::InvalidValue {
                key: "n_splits".into(),
                reason: format!("must be at least 2, got {}", self.n_splits),
            });
        }
        if n_samples < self.n_splits {
            return Err(Error::InvalidValue {
                key: "n_splits".into(),
                reason: format!("cannot have {} folds with {n_samples} samples", self.n_splits),
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let labels = if self.stratified { y.and_then(Target::classes) } else { None };
        let fold_of: Vec<usize> = match labels {
            Some(labels) => {
                let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
                for (i, &label) in labels.iter().enumerate() {
                    by_class.entry(label).or_default().push(i);
                }
                let mut fold_of = vec![0; n_samples];
                let mut next = 0;
                for members in by_class.values_mut() {
                    if self.shuffle {
                        members.shuffle(&mut rng);
                    }
                    for &i in members.iter() {
                        fold_of[i] = next;
                        next = (next + 1) % self.n_splits;
                    }
                }
                fold_of
            }
            None => {
                let mut order: Vec<usize> = (0..n_samples).collect();
                if self.shuffle {
                    order.shuffle(&mut rng);
                }
                let base = n_samples / self.n_splits;
                let remainder = n_samples % self.n_splits;
                let mut fold_of = vec![0; n_samples];
                let mut start = 0;
                for fold in 0..self.n_splits {
                    let size = if fold < remainder { base + 1 } else { base };
                    for &i in &order[start..start + size] {
                        fold_of[i] = fold;
                    }
                    start += size;
                }
                fold_of
            }
        };
        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) = (0..n_samples).partition(|&i| fold_of[i] == fold);
                Fold { train, test }
            })
            .collect())
    }
}
