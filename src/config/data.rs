//! JSON data files: `{ "x": [[...], ...], "y": [...] }`

use crate::dataset::Target;
use crate::net::NetKind;
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Targets as written in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Labels {
    Classes(Vec<usize>),
    Values(Vec<f32>),
    Rows(Vec<Vec<f32>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub x: Vec<Vec<f32>>,
    #[serde(default)]
    pub y: Option<Labels>,
}

fn to_matrix(rows: &[Vec<f32>], what: &str) -> Result<Array2<f32>> {
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        return Err(Error::ShapeMismatch(format!(
            "{what} row {i} has {} columns, expected {n_cols}",
            row.len()
        )));
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_cols), flat).map_err(|e| Error::ShapeMismatch(e.to_string()))
}

impl DataFile {
    pub fn features(&self) -> Result<Array2<f32>> {
        to_matrix(&self.x, "x")
    }

    /// Targets for a net of `kind`: class labels for classifiers, a
    /// `(n, 1)` or `(n, k)` matrix otherwise
    pub fn target(&self, kind: NetKind) -> Result<Option<Target>> {
        let Some(labels) = &self.y else {
            return Ok(None);
        };
        let target = match (kind, labels) {
            (NetKind::Classifier, Labels::Classes(c)) => Target::Classes(Array1::from(c.clone())),
            (NetKind::Classifier, _) => {
                return Err(Error::InvalidValue {
                    key: "y".into(),
                    reason: "classifier data needs non-negative integer labels".into(),
                })
            }
            (_, Labels::Classes(c)) => {
                Target::Values(Array2::from_shape_fn((c.len(), 1), |(i, _)| c[i] as f32))
            }
            (_, Labels::Values(v)) => Target::Values(Array2::from_shape_fn((v.len(), 1), |(i, _)| v[i])),
            (_, Labels::Rows(rows)) => Target::Values(to_matrix(rows, "y")?),
        };
        if target.len() != self.x.len() {
            return Err(Error::ShapeMismatch(format!(
                "x has {} rows, y has {}",
                self.x.len(),
                target.len()
            )));
        }
        Ok(Some(target))
    }
}

/// Read a data file and convert it for a net of `kind`
pub fn load_data<P: AsRef<Path>>(path: P, kind: NetKind) -> Result<(Array2<f32>, Option<Target>)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open data file {}: {e}", path.display())))?;
    let data: DataFile = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok((data.features()?, data.target(kind)?))
}
