//! Probit Bernoulli likelihood

use super::functions::{log_normal_cdf, normal_cdf};
use super::random_variable::RandomVariable;
use crate::{Error, Result};
use ndarray::{Array1, Axis};
use tracing::debug;

/// Samples drawn per point by [`BernoulliLikelihood::log_probability`]
pub const DEFAULT_NUM_SAMPLES: usize = 10;

/// Maps a latent distribution to an output distribution
pub trait Likelihood {
    /// Predictive distribution `p(y | x)` from the latent `p(f | x)`
    fn forward(&self, input: &RandomVariable) -> Result<RandomVariable>;

    /// Monte Carlo estimate of `sum_i E[ln p(y_i | f_i)]`
    fn log_probability(&self, latent: &RandomVariable, target: &Array1<f64>, rng: &mut dyn rand::RngCore)
        -> Result<f64>;
}

/// Bernoulli likelihood with a probit link
///
/// `p(y = 1 | f) = Phi(f)`, and since `Phi(-f) = 1 - Phi(f)` targets are
/// encoded as `-1` / `+1` so that `p(y | f) = Phi(y f)`. With a Gaussian
/// latent `N(mu, s^2)` the predictive probability has the closed form
/// `Phi(mu / sqrt(1 + s^2))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BernoulliLikelihood {
    pub num_samples: usize,
}

impl Default for BernoulliLikelihood {
    fn default() -> Self {
        Self { num_samples: DEFAULT_NUM_SAMPLES }
    }
}

impl BernoulliLikelihood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_samples(num_samples: usize) -> Self {
        Self { num_samples }
    }
}

fn expect_gaussian(input: &RandomVariable) -> Result<(&Array1<f64>, &Array1<f64>)> {
    match input {
        RandomVariable::Gaussian { mean, var } => Ok((mean, var)),
        RandomVariable::Bernoulli { .. } => Err(Error::Likelihood(
            "BernoulliLikelihood expects a Gaussian distributed latent function to make predictions".into(),
        )),
    }
}

impl Likelihood for BernoulliLikelihood {
    fn forward(&self, input: &RandomVariable) -> Result<RandomVariable> {
        let (mean, var) = expect_gaussian(input)?;
        let probs = Array1::from_shape_fn(mean.len(), |i| normal_cdf(mean[i] / (1.0 + var[i]).sqrt()));
        Ok(RandomVariable::Bernoulli { probs })
    }

    fn log_probability(
        &self,
        latent: &RandomVariable,
        target: &Array1<f64>,
        mut rng: &mut dyn rand::RngCore,
    ) -> Result<f64> {
        expect_gaussian(latent)?;
        if target.len() != latent.len() {
            return Err(Error::ShapeMismatch(format!(
                "latent has {} points, target has {}",
                latent.len(),
                target.len()
            )));
        }
        if let Some(t) = target.iter().find(|t| **t != 1.0 && **t != -1.0) {
            return Err(Error::InvalidValue {
                key: "target".into(),
                reason: format!("expected -1 or +1, got {t}"),
            });
        }
        if self.num_samples == 0 {
            return Err(Error::InvalidValue {
                key: "num_samples".into(),
                reason: "must be positive".into(),
            });
        }
        let samples = latent.sample(self.num_samples, &mut rng);
        let total: f64 = samples
            .axis_iter(Axis(0))
            .zip(target.iter())
            .map(|(row, &y)| row.iter().map(|&f| log_normal_cdf(y * f)).sum::<f64>())
            .sum();
        debug!(points = target.len(), num_samples = self.num_samples, "bernoulli log probability");
        Ok(total / self.num_samples as f64)
    }
}
