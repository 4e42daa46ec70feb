use super::SliceDict;
use crate::Result;
use ndarray::{Array2, Axis};
use std::borrow::Cow;

/// Row-indexed model input
pub trait Inputs {
    fn n_rows(&self) -> usize;

    /// Rows at `indices`, in that order
    fn select_rows(&self, indices: &[usize]) -> Self
    where
        Self: Sized;

    /// The `(n_rows, n_features)` matrix handed to an estimator
    fn to_features(&self) -> Result<Cow<'_, Array2<f32>>>;
}

impl Inputs for Array2<f32> {
    fn n_rows(&self) -> usize {
        self.nrows()
    }

    fn select_rows(&self, indices: &[usize]) -> Self {
        self.select(Axis(0), indices)
    }

    fn to_features(&self) -> Result<Cow<'_, Array2<f32>>> {
        Ok(Cow::Borrowed(self))
    }
}

impl Inputs for SliceDict {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn select_rows(&self, indices: &[usize]) -> Self {
        self.select(indices)
    }

    fn to_features(&self) -> Result<Cow<'_, Array2<f32>>> {
        self.to_matrix().map(Cow::Owned)
    }
}
