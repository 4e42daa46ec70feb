//! Likelihoods for Gaussian-process classification
//!
//! - [`RandomVariable`] - Gaussian latent function values or Bernoulli outputs
//! - [`BernoulliLikelihood`] - probit link `p(y = 1 | f) = Phi(f)`
//! - [`normal_cdf`] / [`log_normal_cdf`] - standard normal CDF helpers

mod bernoulli;
mod functions;
mod random_variable;


pub use bernoulli::{BernoulliLikelihood, Likelihood, DEFAULT_NUM_SAMPLES};
pub use functions::{erfc, log_normal_cdf, normal_cdf};
pub use random_variable::RandomVariable;
