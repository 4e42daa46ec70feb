//! Feature standardization

use super::pipeline::Transformer;
use crate::params::Params;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// Removes the per-feature mean and scales to unit variance
///
/// Constant features keep a scale of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub with_mean: bool,
    pub with_std: bool,
    mean: Option<Array1<f32>>,
    scale: Option<Array1<f32>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self { with_mean: true, with_std: true, mean: None, scale: None }
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> Option<&Array1<f32>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f32>> {
        self.scale.as_ref()
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Array2<f32>) -> Result<()> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::ShapeMismatch("cannot fit StandardScaler on 0 samples".into()))?;
        let scale = x.var_axis(Axis(0), 0.0).mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(Error::NotInitialized("This StandardScaler instance is not fitted yet.".into()));
        };
        if x.ncols() != mean.len() {
            return Err(Error::ShapeMismatch(format!(
                "StandardScaler was fitted on {} features, got {}",
                mean.len(),
                x.ncols()
            )));
        }
        let mut out = x.clone();
        if self.with_mean {
            out -= mean;
        }
        if self.with_std {
            out /= scale;
        }
        Ok(out)
    }

    fn get_params(&self) -> Params {
        Params::new().with("with_mean", self.with_mean).with("with_std", self.with_std)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        params.ensure_only(&["with_mean", "with_std"])?;
        self.with_mean = params.bool_or("with_mean", self.with_mean)?;
        self.with_std = params.bool_or("with_std", self.with_std)?;
        Ok(())
    }

    fn clone_unfitted(&self) -> Box<dyn Transformer> {
        Box::new(Self { with_mean: self.with_mean, with_std: self.with_std, ..Self::default() })
    }

    fn type_name(&self) -> &str {
        "StandardScaler"
    }
}
