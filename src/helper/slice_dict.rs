use crate::{Error, Result};
use ndarray::{concatenate, Array2, ArrayD, Axis, Slice};
use std::collections::BTreeSet;
use std::fmt;

/// Named arrays with a shared first axis
///
/// Every array has the same number of rows (`shape[0]`); `len` is that number,
/// or 0 for an empty dict. Row selection (`select`, `slice`, `mask`) applies to
/// all arrays at once. Keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceDict {
    entries: Vec<(String, ArrayD<f32>)>,
    len: usize,
}

fn rows(array: &ArrayD<f32>) -> Result<usize> {
    array
        .shape()
        .first()
        .copied()
        .ok_or_else(|| Error::SliceDict("SliceDict values need at least one axis".into()))
}

impl SliceDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, array)` pairs; all arrays must agree on `shape[0]`
    pub fn from_arrays<K, I>(arrays: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ArrayD<f32>)>,
    {
        let entries: Vec<(String, ArrayD<f32>)> = arrays.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let lengths = entries.iter().map(|(_, v)| rows(v)).collect::<Result<BTreeSet<_>>>()?;
        if lengths.len() > 1 {
            let listed: Vec<String> = lengths.iter().map(usize::to_string).collect();
            return Err(Error::SliceDict(format!(
                "Initialized with items of different lengths: {}",
                listed.join(", ")
            )));
        }
        let len = lengths.first().copied().unwrap_or(0);
        let mut dict = Self { entries: Vec::with_capacity(entries.len()), len };
        for (key, value) in entries {
            dict.put(key, value);
        }
        Ok(dict)
    }

    fn put(&mut self, key: String, value: ArrayD<f32>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Add or replace `key`; the array must have `len()` rows unless the
    /// dict is empty
    pub fn insert(&mut self, key: impl Into<String>, value: ArrayD<f32>) -> Result<()> {
        let n = rows(&value)?;
        if self.entries.is_empty() {
            self.len = n;
        } else if n != self.len {
            return Err(Error::SliceDict(format!("Cannot set array with shape[0] != {}", self.len)));
        }
        self.put(key.into(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ArrayD<f32>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of rows shared by all arrays
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn shape(&self) -> [usize; 1] {
        [self.len]
    }

    fn map_rows(&self, len: usize, f: impl Fn(&ArrayD<f32>) -> ArrayD<f32>) -> Self {
        Self {
            entries: self.entries.iter().map(|(k, v)| (k.clone(), f(v))).collect(),
            len,
        }
    }

    /// Rows at `indices`, in that order
    ///
    /// # Panics
    ///
    /// If an index is out of bounds, like `ndarray`'s `select`.
    pub fn select(&self, indices: &[usize]) -> Self {
        self.map_rows(indices.len(), |v| v.select(Axis(0), indices))
    }

    /// Rows in `slice`; negative bounds count from the end and a negative
    /// step walks the range backwards
    pub fn slice(&self, slice: impl Into<Slice>) -> Self {
        let slice = slice.into();
        let mut out = self.map_rows(0, |v| v.slice_axis(Axis(0), slice).to_owned());
        out.len = match out.entries.first() {
            Some((_, v)) => v.len_of(Axis(0)),
            None => 0,
        };
        out
    }

    /// Rows where `mask` is true
    pub fn mask(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len {
            return Err(Error::SliceDict(format!(
                "boolean mask has {} entries but SliceDict has {} rows",
                mask.len(),
                self.len
            )));
        }
        let indices: Vec<usize> = mask.iter().enumerate().filter_map(|(i, &m)| m.then_some(i)).collect();
        Ok(self.select(&indices))
    }

    /// Flatten every array to `(len, k)` and join them column-wise in key order
    pub fn to_matrix(&self) -> Result<Array2<f32>> {
        let blocks = self
            .entries
            .iter()
            .map(|(key, v)| {
                let cols = v.len().checked_div(self.len).unwrap_or(0);
                v.as_standard_layout()
                    .into_owned()
                    .into_shape_with_order((self.len, cols))
                    .map_err(|e| Error::ShapeMismatch(format!("{key}: {e}")))
            })
            .collect::<Result<Vec<Array2<f32>>>>()?;
        if blocks.is_empty() {
            return Err(Error::SliceDict("SliceDict has no arrays".into()));
        }
        let views: Vec<_> = blocks.iter().map(Array2::view).collect();
        concatenate(Axis(1), &views).map_err(|e| Error::ShapeMismatch(e.to_string()))
    }
}

impl fmt::Display for SliceDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SliceDict(")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={:?}", value.shape())?;
        }
        f.write_str(")")
    }
}
