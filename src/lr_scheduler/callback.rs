//! Learning rate scheduler callback

use super::cyclic::{CyclicConfig, CyclicLR, ScaleFn, ScaleMode};
use super::warm_restart::{WarmRestartConfig, WarmRestartLR};
use crate::callbacks::{BatchContext, Callback, CallbackAction, EpochContext};
use crate::history::BATCHES;
use crate::net::NeuralNet;
use crate::params::Params;
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which schedule the callback drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    #[default]
    WarmRestartLR,
    CyclicLR,
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WarmRestartLR" => Ok(Policy::WarmRestartLR),
            "CyclicLR" => Ok(Policy::CyclicLR),
            other => Err(Error::InvalidValue {
                key: "policy".into(),
                reason: format!("unknown lr policy '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::WarmRestartLR => f.write_str("WarmRestartLR"),
            Policy::CyclicLR => f.write_str("CyclicLR"),
        }
    }
}

/// A scheduler bound to the net's optimizer
#[derive(Debug, Clone)]
pub enum Scheduler {
    WarmRestart(WarmRestartLR),
    Cyclic(CyclicLR),
}

/// Callback that sets the learning rate of each parameter group by a policy
///
/// The scheduler is built at train begin from the current history so that a
/// resumed fit continues the schedule: warm restarts start at
/// `len(history) - 1`, cyclic schedules after the last recorded training
/// batch. Warm restarts step at every epoch begin, cyclic schedules at every
/// training batch begin.
///
/// ```rust,ignore
/// let cb = LRScheduler::new(Policy::CyclicLR, Params::new().with("step_size", 4));
/// let net = NeuralNet::classifier(factory, Params::new())?.with_callback("lr", cb);
/// ```
#[derive(Clone, Default)]
pub struct LRScheduler {
    pub policy: Policy,
    /// Scheduler settings, see [`WarmRestartConfig`] and [`CyclicConfig`]
    pub kwargs: Params,
    scale_fn: Option<(ScaleFn, ScaleMode)>,
    scheduler: Option<Scheduler>,
}

impl LRScheduler {
    pub fn new(policy: Policy, kwargs: Params) -> Self {
        Self { policy, kwargs, scale_fn: None, scheduler: None }
    }

    /// Custom cyclic amplitude scaling
    pub fn with_scale_fn(mut self, f: impl Fn(f64) -> f64 + Send + Sync + 'static, mode: ScaleMode) -> Self {
        self.scale_fn = Some((Arc::new(f), mode));
        self
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    fn validate(&self) -> Result<()> {
        match self.policy {
            Policy::WarmRestartLR => WarmRestartConfig::from_params(&self.kwargs).map(|_| ()),
            Policy::CyclicLR => CyclicConfig::from_params(&self.kwargs).map(|_| ()),
        }
    }
}

fn trained_batches(net: &NeuralNet) -> usize {
    net.history()
        .iter()
        .filter_map(|record| record.get(BATCHES).and_then(Value::as_array))
        .map(|batches| batches.iter().filter(|b| b.get("train_loss").is_some()).count())
        .sum()
}

impl Callback for LRScheduler {
    fn initialize(&mut self) -> Result<()> {
        self.validate()?;
        self.scheduler = None;
        Ok(())
    }

    fn on_train_begin(&mut self, net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        let scheduler = match self.policy {
            Policy::WarmRestartLR => {
                let mut config = WarmRestartConfig::from_params(&self.kwargs)?;
                if !self.kwargs.contains_key("last_epoch") {
                    config.last_epoch = net.history().len() as i64 - 1;
                }
                Scheduler::WarmRestart(WarmRestartLR::new(net.optimizer_mut()?.as_mut(), config)?)
            }
            Policy::CyclicLR => {
                let mut config = CyclicConfig::from_params(&self.kwargs)?;
                if !self.kwargs.contains_key("last_batch_idx") {
                    config.last_batch_idx = trained_batches(net) as i64 - 1;
                }
                if let Some((f, mode)) = &self.scale_fn {
                    config.scale_fn = Some(Arc::clone(f));
                    config.scale_mode = *mode;
                }
                Scheduler::Cyclic(CyclicLR::new(net.optimizer_mut()?.as_mut(), config)?)
            }
        };
        self.scheduler = Some(scheduler);
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_begin(&mut self, net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        if let Some(Scheduler::WarmRestart(scheduler)) = self.scheduler.as_mut() {
            let epoch = net.history().len() as i64 - 1;
            scheduler.step(net.optimizer_mut()?.as_mut(), Some(epoch))?;
        }
        Ok(CallbackAction::Continue)
    }

    fn on_batch_begin(&mut self, net: &mut NeuralNet, batch: &BatchContext<'_>) -> Result<CallbackAction> {
        if !batch.training {
            return Ok(CallbackAction::Continue);
        }
        if let Some(Scheduler::Cyclic(scheduler)) = self.scheduler.as_mut() {
            scheduler.batch_step(net.optimizer_mut()?.as_mut(), None)?;
        }
        Ok(CallbackAction::Continue)
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new().with("policy", self.policy.to_string());
        params.extend(&self.kwargs);
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        let mut updated = self.clone();
        for (key, value) in params.iter() {
            if key == "policy" {
                updated.policy = value.as_str().unwrap_or_default().parse()?;
            } else {
                updated.kwargs.insert(key, value.clone());
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn type_name(&self) -> &str {
        "LRScheduler"
    }
}
