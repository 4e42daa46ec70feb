use crate::helper::SliceDict;
use crate::params::Params;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// Supervision signal: class labels or real-valued targets
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Classes(Array1<usize>),
    Values(Array2<f32>),
}

impl Target {
    pub fn len(&self) -> usize {
        match self {
            Target::Classes(y) => y.len(),
            Target::Values(y) => y.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Target {
        match self {
            Target::Classes(y) => Target::Classes(y.select(Axis(0), indices)),
            Target::Values(y) => Target::Values(y.select(Axis(0), indices)),
        }
    }

    pub fn classes(&self) -> Option<&Array1<usize>> {
        match self {
            Target::Classes(y) => Some(y),
            Target::Values(_) => None,
        }
    }

    pub fn values(&self) -> Option<&Array2<f32>> {
        match self {
            Target::Values(y) => Some(y),
            Target::Classes(_) => None,
        }
    }

    /// `max(label) + 1` for class targets
    pub fn n_classes(&self) -> Option<usize> {
        self.classes().map(|y| y.iter().max().map_or(0, |m| m + 1))
    }

    /// Concatenate along the sample axis; both parts must be the same kind
    pub fn concat(&self, other: &Target) -> Result<Target> {
        match (self, other) {
            (Target::Classes(a), Target::Classes(b)) => Ok(Target::Classes(
                ndarray::concatenate(Axis(0), &[a.view(), b.view()])
                    .map_err(|e| Error::ShapeMismatch(e.to_string()))?,
            )),
            (Target::Values(a), Target::Values(b)) => Ok(Target::Values(
                ndarray::concatenate(Axis(0), &[a.view(), b.view()])
                    .map_err(|e| Error::ShapeMismatch(e.to_string()))?,
            )),
            _ => Err(Error::ShapeMismatch("cannot mix class and value targets".into())),
        }
    }
}

impl From<Vec<usize>> for Target {
    fn from(labels: Vec<usize>) -> Self {
        Target::Classes(Array1::from(labels))
    }
}

impl From<Array1<usize>> for Target {
    fn from(labels: Array1<usize>) -> Self {
        Target::Classes(labels)
    }
}

impl From<Array2<f32>> for Target {
    fn from(values: Array2<f32>) -> Self {
        Target::Values(values)
    }
}

/// Feature rows with optional targets of matching length
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    y: Option<Target>,
}

impl Dataset {
    pub fn new(x: Array2<f32>, y: Option<Target>) -> Result<Self> {
        if let Some(y) = &y {
            if y.len() != x.nrows() {
                return Err(Error::ShapeMismatch(format!(
                    "X has {} samples but y has {}",
                    x.nrows(),
                    y.len()
                )));
            }
        }
        Ok(Self { x, y })
    }

    /// Dataset over the flattened, column-joined arrays of `x`
    pub fn from_slice_dict(x: &SliceDict, y: Option<Target>) -> Result<Self> {
        Self::new(x.to_matrix()?, y)
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }

    pub fn y(&self) -> Option<&Target> {
        self.y.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// New dataset from the rows at `indices`
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: self.y.as_ref().map(|y| y.select(indices)),
        }
    }
}

/// Turns raw arrays plus `dataset__*` kwargs into a [`Dataset`]
pub trait DatasetFactory: Send + Sync {
    fn build(&self, x: Array2<f32>, y: Option<Target>, kwargs: &Params) -> Result<Dataset>;
}

/// Wraps arrays as-is; accepts an optional `length` that must match `X`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDatasetFactory;

impl DatasetFactory for DefaultDatasetFactory {
    fn build(&self, x: Array2<f32>, y: Option<Target>, kwargs: &Params) -> Result<Dataset> {
        kwargs.ensure_only(&["length"])?;
        if let Some(length) = kwargs.get("length") {
            let expected = length.as_usize().ok_or_else(|| Error::InvalidValue {
                key: "length".into(),
                reason: format!("expected a non-negative int, got {length}"),
            })?;
            if expected != x.nrows() {
                return Err(Error::ShapeMismatch(format!(
                    "length is {expected} but X has {} samples",
                    x.nrows()
                )));
            }
        }
        Dataset::new(x, y)
    }
}
