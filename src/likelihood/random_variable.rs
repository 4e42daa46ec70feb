//! Random variables passed between likelihoods

use crate::{Error, Result};
use ndarray::{Array1, Array2};
use rand::Rng;
use std::f64::consts::PI;

/// Independent per-point random variables
#[derive(Debug, Clone, PartialEq)]
pub enum RandomVariable {
    /// Latent function values `f_i ~ N(mean_i, var_i)`
    Gaussian { mean: Array1<f64>, var: Array1<f64> },
    /// Output labels `y_i ~ Bernoulli(probs_i)`
    Bernoulli { probs: Array1<f64> },
}

impl RandomVariable {
    pub fn gaussian(mean: Array1<f64>, var: Array1<f64>) -> Result<Self> {
        if mean.len() != var.len() {
            return Err(Error::ShapeMismatch(format!(
                "mean has {} entries, var has {}",
                mean.len(),
                var.len()
            )));
        }
        if let Some(v) = var.iter().find(|v| v.is_nan() || **v < 0.0) {
            return Err(Error::InvalidValue {
                key: "var".into(),
                reason: format!("variances must be non-negative, got {v}"),
            });
        }
        Ok(RandomVariable::Gaussian { mean, var })
    }

    pub fn bernoulli(probs: Array1<f64>) -> Result<Self> {
        if let Some(p) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(Error::InvalidValue {
                key: "probs".into(),
                reason: format!("probabilities must be in [0, 1], got {p}"),
            });
        }
        Ok(RandomVariable::Bernoulli { probs })
    }

    pub fn len(&self) -> usize {
        match self {
            RandomVariable::Gaussian { mean, .. } => mean.len(),
            RandomVariable::Bernoulli { probs } => probs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mean(&self) -> Array1<f64> {
        match self {
            RandomVariable::Gaussian { mean, .. } => mean.clone(),
            RandomVariable::Bernoulli { probs } => probs.clone(),
        }
    }

    pub fn var(&self) -> Array1<f64> {
        match self {
            RandomVariable::Gaussian { var, .. } => var.clone(),
            RandomVariable::Bernoulli { probs } => probs.mapv(|p| p * (1.0 - p)),
        }
    }

    /// `num_samples` draws per point, shape `(len, num_samples)`
    pub fn sample<R: Rng>(&self, num_samples: usize, rng: &mut R) -> Array2<f64> {
        match self {
            RandomVariable::Gaussian { mean, var } => {
                Array2::from_shape_fn((mean.len(), num_samples), |(i, _)| {
                    // Box-Muller transform
                    let u1: f64 = rng.random::<f64>().max(1e-300);
                    let u2: f64 = rng.random::<f64>();
                    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
                    mean[i] + var[i].sqrt() * z
                })
            }
            RandomVariable::Bernoulli { probs } => Array2::from_shape_fn((probs.len(), num_samples), |(i, _)| {
                if rng.random::<f64>() < probs[i] {
                    1.0
                } else {
                    0.0
                }
            }),
        }
    }
}
