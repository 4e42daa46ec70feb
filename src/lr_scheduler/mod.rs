//! Learning rate schedulers
//!
//! - [`WarmRestartLR`] - cosine annealing with warm restarts, stepped per epoch
//! - [`CyclicLR`] - triangular / exponential cycles, stepped per training batch
//! - [`LRScheduler`] - callback driving either policy from the fit loop
//!
//! Both schedulers are pure functions of their index (`lr_at`) and write one
//! learning rate per optimizer parameter group.

mod callback;
mod cyclic;
mod warm_restart;


pub use callback::{LRScheduler, Policy, Scheduler};
pub use cyclic::{CyclicConfig, CyclicLR, ScaleFn, ScaleMode};
pub use warm_restart::{WarmRestartConfig, WarmRestartLR};

use crate::params::ParamValue;
use crate::{Error, Result};

/// A learning rate bound shared by all groups or given per group
#[derive(Debug, Clone, PartialEq)]
pub enum LrSpec {
    Scalar(f64),
    PerGroup(Vec<f64>),
}

impl LrSpec {
    /// Expand to one value per group; per-group lists must match the group count
    pub fn per_group(&self, name: &str, n_groups: usize) -> Result<Vec<f64>> {
        match self {
            LrSpec::Scalar(v) => Ok(vec![*v; n_groups]),
            LrSpec::PerGroup(values) if values.len() == n_groups => Ok(values.clone()),
            LrSpec::PerGroup(values) => Err(Error::LengthMismatch {
                name: name.to_string(),
                expected: n_groups,
                got: values.len(),
            }),
        }
    }

    pub(crate) fn from_param(name: &str, value: Option<&ParamValue>, default: LrSpec) -> Result<Self> {
        let Some(value) = value else {
            return Ok(default);
        };
        if let Some(v) = value.as_f64() {
            return Ok(LrSpec::Scalar(v));
        }
        let invalid = || Error::InvalidValue {
            key: name.to_string(),
            reason: format!("expected a number or a list of numbers, got {value}"),
        };
        let list = value.as_list().ok_or_else(invalid)?;
        list.iter()
            .map(|v| v.as_f64().ok_or_else(invalid))
            .collect::<Result<Vec<f64>>>()
            .map(LrSpec::PerGroup)
    }
}

impl From<f64> for LrSpec {
    fn from(v: f64) -> Self {
        LrSpec::Scalar(v)
    }
}

impl From<Vec<f64>> for LrSpec {
    fn from(v: Vec<f64>) -> Self {
        LrSpec::PerGroup(v)
    }
}
