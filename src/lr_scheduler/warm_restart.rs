//! Stochastic gradient descent with warm restarts (SGDR)

use super::LrSpec;
use crate::optim::Optimizer;
use crate::params::Params;
use crate::Result;
use std::f64::consts::PI;

/// Settings for [`WarmRestartLR`]
#[derive(Debug, Clone, PartialEq)]
pub struct WarmRestartConfig {
    pub min_lr: LrSpec,
    pub max_lr: LrSpec,
    pub base_period: f64,
    pub period_mult: f64,
    pub last_epoch: i64,
}

impl Default for WarmRestartConfig {
    fn default() -> Self {
        Self {
            min_lr: LrSpec::Scalar(1e-6),
            max_lr: LrSpec::Scalar(0.05),
            base_period: 10.0,
            period_mult: 2.0,
            last_epoch: -1,
        }
    }
}

impl WarmRestartConfig {
    pub const KEYS: [&'static str; 5] = ["min_lr", "max_lr", "base_period", "period_mult", "last_epoch"];

    pub fn from_params(kwargs: &Params) -> Result<Self> {
        kwargs.ensure_only(&Self::KEYS)?;
        let defaults = Self::default();
        Ok(Self {
            min_lr: LrSpec::from_param("min_lr", kwargs.get("min_lr"), defaults.min_lr)?,
            max_lr: LrSpec::from_param("max_lr", kwargs.get("max_lr"), defaults.max_lr)?,
            base_period: kwargs.f64_or("base_period", defaults.base_period)?,
            period_mult: kwargs.f64_or("period_mult", defaults.period_mult)?,
            last_epoch: kwargs.i64_or("last_epoch", defaults.last_epoch)?,
        })
    }
}

/// Cosine-annealed learning rate that restarts at `max_lr` after each period
///
/// Periods grow by `period_mult` after every restart:
///
/// ```text
/// e = epoch; T = base_period
/// while e / T > 1: e -= T + 1; T *= period_mult
/// lr = min_lr + 0.5 (max_lr - min_lr) (1 + cos(pi e / T))
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WarmRestartLR {
    min_lr: Vec<f64>,
    max_lr: Vec<f64>,
    base_period: f64,
    period_mult: f64,
    last_epoch: i64,
}

impl WarmRestartLR {
    /// Bind to `optimizer`'s groups and apply the lr for `last_epoch + 1`
    pub fn new(optimizer: &mut dyn Optimizer, config: WarmRestartConfig) -> Result<Self> {
        let mut scheduler = Self::for_groups(optimizer.param_groups().len(), config)?;
        scheduler.step(optimizer, Some(scheduler.last_epoch))?;
        Ok(scheduler)
    }

    /// Schedule for `n_groups` groups positioned at `last_epoch + 1`, without an optimizer
    pub fn for_groups(n_groups: usize, config: WarmRestartConfig) -> Result<Self> {
        Ok(Self {
            min_lr: config.min_lr.per_group("min_lr", n_groups)?,
            max_lr: config.max_lr.per_group("max_lr", n_groups)?,
            base_period: config.base_period,
            period_mult: config.period_mult,
            last_epoch: config.last_epoch + 1,
        })
    }

    pub fn last_epoch(&self) -> i64 {
        self.last_epoch
    }

    /// Learning rate of each group at `epoch`
    pub fn lr_at(&self, epoch: i64) -> Vec<f64> {
        let mut epoch_idx = epoch as f64;
        let mut period = self.base_period;
        while epoch_idx / period > 1.0 {
            epoch_idx -= period + 1.0;
            period *= self.period_mult;
        }
        let cos = 1.0 + (epoch_idx * PI / period).cos();
        self.min_lr
            .iter()
            .zip(&self.max_lr)
            .map(|(&lo, &hi)| lo + 0.5 * (hi - lo) * cos)
            .collect()
    }

    pub fn get_lr(&self) -> Vec<f64> {
        self.lr_at(self.last_epoch)
    }

    /// Move to `epoch` (or the next one) and write the rates into the optimizer
    pub fn step(&mut self, optimizer: &mut dyn Optimizer, epoch: Option<i64>) -> Result<()> {
        self.last_epoch = epoch.unwrap_or(self.last_epoch + 1);
        optimizer.set_group_lrs(&self.get_lr())
    }
}
