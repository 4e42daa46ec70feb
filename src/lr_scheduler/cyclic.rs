//! Cyclical learning rates (CLR)

use super::LrSpec;
use crate::optim::Optimizer;
use crate::params::Params;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Custom amplitude scaling, expected to stay within `[0, 1]`
pub type ScaleFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// What a scale function receives: the cycle number or the batch index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    Cycle,
    Iterations,
}

impl FromStr for ScaleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cycle" => Ok(ScaleMode::Cycle),
            "iterations" => Ok(ScaleMode::Iterations),
            other => Err(Error::InvalidValue {
                key: "scale_mode".into(),
                reason: format!("expected 'cycle' or 'iterations', got '{other}'"),
            }),
        }
    }
}

#[derive(Clone)]
enum Scale {
    Triangular,
    Triangular2,
    ExpRange(f64),
    Custom(ScaleFn, ScaleMode),
}

impl Scale {
    fn mode(&self) -> ScaleMode {
        match self {
            Scale::Triangular | Scale::Triangular2 => ScaleMode::Cycle,
            Scale::ExpRange(_) => ScaleMode::Iterations,
            Scale::Custom(_, mode) => *mode,
        }
    }

    fn apply(&self, x: f64) -> f64 {
        match self {
            Scale::Triangular => 1.0,
            Scale::Triangular2 => 1.0 / 2f64.powf(x - 1.0),
            Scale::ExpRange(gamma) => gamma.powf(x),
            Scale::Custom(f, _) => f(x),
        }
    }
}

impl fmt::Debug for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Triangular => f.write_str("Triangular"),
            Scale::Triangular2 => f.write_str("Triangular2"),
            Scale::ExpRange(g) => write!(f, "ExpRange({g})"),
            Scale::Custom(_, mode) => write!(f, "Custom({mode:?})"),
        }
    }
}

/// Settings for [`CyclicLR`]
#[derive(Clone)]
pub struct CyclicConfig {
    pub base_lr: LrSpec,
    pub max_lr: LrSpec,
    /// Training iterations per half cycle
    pub step_size: f64,
    /// `triangular`, `triangular2` or `exp_range`; ignored when `scale_fn` is set
    pub mode: String,
    pub gamma: f64,
    pub scale_fn: Option<ScaleFn>,
    pub scale_mode: ScaleMode,
    pub last_batch_idx: i64,
}

impl Default for CyclicConfig {
    fn default() -> Self {
        Self {
            base_lr: LrSpec::Scalar(1e-3),
            max_lr: LrSpec::Scalar(6e-3),
            step_size: 2000.0,
            mode: "triangular".to_string(),
            gamma: 1.0,
            scale_fn: None,
            scale_mode: ScaleMode::Cycle,
            last_batch_idx: -1,
        }
    }
}

impl fmt::Debug for CyclicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CyclicConfig")
            .field("base_lr", &self.base_lr)
            .field("max_lr", &self.max_lr)
            .field("step_size", &self.step_size)
            .field("mode", &self.mode)
            .field("gamma", &self.gamma)
            .field("scale_fn", &self.scale_fn.as_ref().map(|_| "<fn>"))
            .field("scale_mode", &self.scale_mode)
            .field("last_batch_idx", &self.last_batch_idx)
            .finish()
    }
}

impl CyclicConfig {
    pub const KEYS: [&'static str; 7] =
        ["base_lr", "max_lr", "step_size", "mode", "gamma", "scale_mode", "last_batch_idx"];

    pub fn from_params(kwargs: &Params) -> Result<Self> {
        kwargs.ensure_only(&Self::KEYS)?;
        let defaults = Self::default();
        Ok(Self {
            base_lr: LrSpec::from_param("base_lr", kwargs.get("base_lr"), defaults.base_lr)?,
            max_lr: LrSpec::from_param("max_lr", kwargs.get("max_lr"), defaults.max_lr)?,
            step_size: kwargs.f64_or("step_size", defaults.step_size)?,
            mode: kwargs.str_or("mode", &defaults.mode)?.to_string(),
            gamma: kwargs.f64_or("gamma", defaults.gamma)?,
            scale_fn: None,
            scale_mode: kwargs.str_or("scale_mode", "cycle")?.parse()?,
            last_batch_idx: kwargs.i64_or("last_batch_idx", defaults.last_batch_idx)?,
        })
    }

    pub fn with_scale_fn(mut self, f: impl Fn(f64) -> f64 + Send + Sync + 'static, mode: ScaleMode) -> Self {
        self.scale_fn = Some(Arc::new(f));
        self.scale_mode = mode;
        self
    }
}

/// Learning rate cycling between `base_lr` and `max_lr` once per `2 * step_size` batches
///
/// ```text
/// cycle = floor(1 + i / (2 s)); x = |i / s - 2 cycle + 1|
/// lr = base + (max - base) * max(0, 1 - x) * scale(cycle or i)
/// ```
#[derive(Debug, Clone)]
pub struct CyclicLR {
    base_lrs: Vec<f64>,
    max_lrs: Vec<f64>,
    step_size: f64,
    scale: Scale,
    last_batch_idx: i64,
}

impl CyclicLR {
    /// Bind to `optimizer`'s groups and apply the lr for `last_batch_idx + 1`
    ///
    /// `last_batch_idx` itself is kept, so the next [`batch_step`](Self::batch_step)
    /// without an index lands on `last_batch_idx + 1` again.
    pub fn new(optimizer: &mut dyn Optimizer, config: CyclicConfig) -> Result<Self> {
        let mut scheduler = Self::for_groups(optimizer.param_groups().len(), config)?;
        let last = scheduler.last_batch_idx;
        scheduler.batch_step(optimizer, Some(last + 1))?;
        scheduler.last_batch_idx = last;
        Ok(scheduler)
    }

    /// Schedule for `n_groups` groups, without an optimizer
    pub fn for_groups(n_groups: usize, config: CyclicConfig) -> Result<Self> {
        let scale = match (&config.scale_fn, config.mode.as_str()) {
            (Some(f), _) => Scale::Custom(Arc::clone(f), config.scale_mode),
            (None, "triangular") => Scale::Triangular,
            (None, "triangular2") => Scale::Triangular2,
            (None, "exp_range") => Scale::ExpRange(config.gamma),
            (None, other) => return Err(Error::InvalidMode(other.to_string())),
        };
        Ok(Self {
            base_lrs: config.base_lr.per_group("base_lr", n_groups)?,
            max_lrs: config.max_lr.per_group("max_lr", n_groups)?,
            step_size: config.step_size,
            scale,
            last_batch_idx: config.last_batch_idx,
        })
    }

    pub fn last_batch_idx(&self) -> i64 {
        self.last_batch_idx
    }

    /// Learning rate of each group at batch `idx`
    pub fn lr_at(&self, idx: i64) -> Vec<f64> {
        let i = idx as f64;
        let cycle = (1.0 + i / (2.0 * self.step_size)).floor();
        let x = (i / self.step_size - 2.0 * cycle + 1.0).abs();
        let scale = match self.scale.mode() {
            ScaleMode::Cycle => self.scale.apply(cycle),
            ScaleMode::Iterations => self.scale.apply(i),
        };
        self.base_lrs
            .iter()
            .zip(&self.max_lrs)
            .map(|(&base, &max)| base + (max - base) * (1.0 - x).max(0.0) * scale)
            .collect()
    }

    pub fn get_lr(&self) -> Vec<f64> {
        self.lr_at(self.last_batch_idx)
    }

    /// Move to `batch_idx` (or the next one) and write the rates into the optimizer
    pub fn batch_step(&mut self, optimizer: &mut dyn Optimizer, batch_idx: Option<i64>) -> Result<()> {
        self.last_batch_idx = batch_idx.unwrap_or(self.last_batch_idx + 1);
        optimizer.set_group_lrs(&self.get_lr())
    }
}
