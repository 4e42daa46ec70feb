use super::data::{Dataset, Target};
use crate::params::Params;
use crate::{Error, Result};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Batching options, read from `iterator_train__*` / `iterator_valid__*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// `None` yields the whole dataset as one batch
    pub batch_size: Option<usize>,
    pub shuffle: bool,
    pub drop_last: bool,
}

impl LoaderConfig {
    pub const KEYS: [&'static str; 3] = ["batch_size", "shuffle", "drop_last"];

    /// `batch_size` follows the estimator convention: `-1` means everything
    pub fn from_params(default_batch_size: i64, default_shuffle: bool, kwargs: &Params) -> Result<Self> {
        kwargs.ensure_only(&Self::KEYS)?;
        let batch_size = kwargs.i64_or("batch_size", default_batch_size)?;
        let batch_size = match batch_size {
            -1 => None,
            n if n > 0 => Some(n as usize),
            n => {
                return Err(Error::InvalidValue {
                    key: "batch_size".into(),
                    reason: format!("must be positive or -1, got {n}"),
                })
            }
        };
        Ok(Self {
            batch_size,
            shuffle: kwargs.bool_or("shuffle", default_shuffle)?,
            drop_last: kwargs.bool_or("drop_last", false)?,
        })
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: Some(128), shuffle: false, drop_last: false }
    }
}

/// One mini-batch
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Option<Target>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterates a dataset in batches, optionally in a shuffled order
pub struct DataLoader<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    drop_last: bool,
    pos: usize,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a Dataset, config: LoaderConfig, rng: &mut StdRng) -> Self {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if config.shuffle {
            order.shuffle(rng);
        }
        Self {
            dataset,
            order,
            batch_size: config.batch_size.unwrap_or(dataset.len()).max(1),
            drop_last: config.drop_last,
            pos: 0,
        }
    }

    /// Number of batches this loader yields in total
    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let remaining = self.order.len().saturating_sub(self.pos);
        if remaining == 0 || (self.drop_last && remaining < self.batch_size) {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let idx = &self.order[self.pos..end];
        self.pos = end;
        Some(Batch {
            x: self.dataset.x().select(Axis(0), idx),
            y: self.dataset.y().map(|y| y.select(idx)),
        })
    }
}
