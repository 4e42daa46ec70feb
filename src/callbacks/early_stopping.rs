//! Early stopping on a monitored history key

use super::traits::{check_keys, Callback, CallbackAction, EpochContext};
use crate::net::NeuralNet;
use crate::params::Params;
use crate::{Error, Result};
use tracing::info;

/// Stops training when `monitor` has not improved for `patience` epochs
///
/// With `threshold_mode = "rel"` an improvement must beat the best score by
/// a factor of `threshold`; with `"abs"` by an absolute margin.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    pub monitor: String,
    pub patience: usize,
    pub threshold: f64,
    pub threshold_mode: String,
    pub lower_is_better: bool,
    misses: usize,
    best: Option<f64>,
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self {
            monitor: "valid_loss".to_string(),
            patience: 5,
            threshold: 1e-4,
            threshold_mode: "rel".to_string(),
            lower_is_better: true,
            misses: 0,
            best: None,
        }
    }
}

impl EarlyStopping {
    pub fn new(monitor: impl Into<String>, patience: usize) -> Self {
        Self { monitor: monitor.into(), patience, ..Self::default() }
    }

    fn improves(&self, score: f64, best: f64) -> bool {
        let margin = if self.threshold_mode == "rel" {
            best.abs() * self.threshold
        } else {
            self.threshold
        };
        if self.lower_is_better {
            score < best - margin
        } else {
            score > best + margin
        }
    }
}

impl Callback for EarlyStopping {
    fn initialize(&mut self) -> Result<()> {
        if self.threshold_mode != "rel" && self.threshold_mode != "abs" {
            return Err(Error::InvalidValue {
                key: "threshold_mode".into(),
                reason: format!("expected 'rel' or 'abs', got '{}'", self.threshold_mode),
            });
        }
        self.misses = 0;
        self.best = None;
        Ok(())
    }

    fn on_train_begin(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        self.misses = 0;
        self.best = None;
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        let Some(score) = net.history().last_f64(&self.monitor) else {
            return Ok(CallbackAction::Continue);
        };
        match self.best {
            Some(best) if !self.improves(score, best) => self.misses += 1,
            _ => {
                self.best = Some(score);
                self.misses = 0;
            }
        }
        if self.misses >= self.patience {
            info!(monitor = %self.monitor, patience = self.patience, "early stopping");
            if net.verbose() > 0 {
                println!(
                    "Stopping since {} has not improved in the last {} epochs.",
                    self.monitor, self.patience
                );
            }
            return Ok(CallbackAction::Stop);
        }
        Ok(CallbackAction::Continue)
    }

    fn get_params(&self) -> Params {
        Params::new()
            .with("monitor", self.monitor.as_str())
            .with("patience", self.patience)
            .with("threshold", self.threshold)
            .with("threshold_mode", self.threshold_mode.as_str())
            .with("lower_is_better", self.lower_is_better)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        check_keys(
            params,
            &["monitor", "patience", "threshold", "threshold_mode", "lower_is_better"],
            self.type_name(),
        )?;
        self.monitor = params.str_or("monitor", &self.monitor)?.to_string();
        self.patience = params.usize_or("patience", self.patience)?;
        self.threshold = params.f64_or("threshold", self.threshold)?;
        self.threshold_mode = params.str_or("threshold_mode", &self.threshold_mode)?.to_string();
        self.lower_is_better = params.bool_or("lower_is_better", self.lower_is_better)?;
        Ok(())
    }

    fn type_name(&self) -> &str {
        "EarlyStopping"
    }
}
