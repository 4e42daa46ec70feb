//! Per-epoch scores recorded into the history

use super::traits::{check_keys, BatchContext, Callback, CallbackAction, EpochContext};
use crate::dataset::Target;
use crate::history::BATCHES;
use crate::net::NeuralNet;
use crate::params::Params;
use crate::{Error, Result};
use ndarray::{Array2, Axis};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type ScoreFn = Arc<dyn Fn(&Array2<f32>, &Target) -> Result<f64> + Send + Sync>;

/// How module outputs are scored against targets
#[derive(Clone)]
pub enum Scoring {
    /// Fraction of rows whose argmax equals the class label
    Accuracy,
    /// Coefficient of determination over all output columns
    R2,
    NegMeanSquaredError,
    Custom(String, ScoreFn),
}

impl Scoring {
    pub fn score(&self, output: &Array2<f32>, target: &Target) -> Result<f64> {
        match self {
            Scoring::Accuracy => accuracy(output, target),
            Scoring::R2 => r2_score(output, target),
            Scoring::NegMeanSquaredError => {
                let y = regression_target(output, target)?;
                let n = output.len().max(1) as f64;
                Ok(-output.iter().zip(y).map(|(&p, &t)| f64::from(p - t).powi(2)).sum::<f64>() / n)
            }
            Scoring::Custom(_, f) => f(output, target),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::R2 => "r2",
            Scoring::NegMeanSquaredError => "neg_mean_squared_error",
            Scoring::Custom(name, _) => name,
        }
    }
}

impl fmt::Debug for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scoring({})", self.name())
    }
}

impl FromStr for Scoring {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" => Ok(Scoring::Accuracy),
            "r2" => Ok(Scoring::R2),
            "neg_mean_squared_error" => Ok(Scoring::NegMeanSquaredError),
            other => Err(Error::InvalidValue {
                key: "scoring".into(),
                reason: format!("unknown scoring '{other}'"),
            }),
        }
    }
}

/// Row-wise argmax
pub fn argmax_rows(output: &Array2<f32>) -> Vec<usize> {
    output
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
                .0
        })
        .collect()
}

pub fn accuracy(output: &Array2<f32>, target: &Target) -> Result<f64> {
    let labels = target
        .classes()
        .ok_or_else(|| Error::ShapeMismatch("accuracy needs class labels".into()))?;
    if labels.len() != output.nrows() {
        return Err(Error::ShapeMismatch(format!(
            "{} predictions for {} labels",
            output.nrows(),
            labels.len()
        )));
    }
    if labels.is_empty() {
        return Ok(0.0);
    }
    let hits = argmax_rows(output).iter().zip(labels).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / labels.len() as f64)
}

fn regression_target<'a>(output: &Array2<f32>, target: &'a Target) -> Result<&'a Array2<f32>> {
    let y = target
        .values()
        .ok_or_else(|| Error::ShapeMismatch("regression scores need real-valued targets".into()))?;
    if y.dim() != output.dim() {
        return Err(Error::ShapeMismatch(format!(
            "predictions {:?} do not match targets {:?}",
            output.dim(),
            y.dim()
        )));
    }
    Ok(y)
}

/// `1 - SS_res / SS_tot`, averaged uniformly over output columns
pub fn r2_score(output: &Array2<f32>, target: &Target) -> Result<f64> {
    let y = regression_target(output, target)?;
    let mut total = 0.0;
    for (pred, truth) in output.axis_iter(Axis(1)).zip(y.axis_iter(Axis(1))) {
        let mean = truth.iter().map(|&v| f64::from(v)).sum::<f64>() / truth.len().max(1) as f64;
        let ss_res: f64 = pred.iter().zip(truth).map(|(&p, &t)| f64::from(t - p).powi(2)).sum();
        let ss_tot: f64 = truth.iter().map(|&t| (f64::from(t) - mean).powi(2)).sum();
        total += if ss_tot == 0.0 {
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };
    }
    Ok(total / y.ncols().max(1) as f64)
}

/// Record `score` under `key` and whether it beats every earlier epoch
pub(crate) fn record_with_best(net: &mut NeuralNet, key: &str, score: f64, lower_is_better: bool) -> Result<()> {
    let history = net.history_mut();
    let previous: Vec<f64> = history
        .iter()
        .take(history.len().saturating_sub(1))
        .filter_map(|r| r.get(key).and_then(Value::as_f64))
        .collect();
    let is_best = previous
        .iter()
        .all(|&p| if lower_is_better { score < p } else { score > p });
    history.record(key, score)?;
    history.record(format!("{key}_best"), is_best)?;
    Ok(())
}

/// Epoch mean of a per-batch value, weighted by batch size
///
/// Used for `train_loss` and `valid_loss`: the net records the batch losses
/// and sizes, this callback averages them at epoch end.
#[derive(Debug, Clone)]
pub struct PassthroughScoring {
    pub name: String,
    pub lower_is_better: bool,
    pub on_train: bool,
}

impl PassthroughScoring {
    pub fn new(name: impl Into<String>, on_train: bool) -> Self {
        Self { name: name.into(), lower_is_better: true, on_train }
    }

    fn size_key(&self) -> &'static str {
        if self.on_train {
            "train_batch_size"
        } else {
            "valid_batch_size"
        }
    }
}

impl Default for PassthroughScoring {
    fn default() -> Self {
        Self::new("valid_loss", false)
    }
}

impl Callback for PassthroughScoring {
    fn on_epoch_end(&mut self, net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        let Ok(record) = net.history().epoch(-1) else {
            return Ok(CallbackAction::Continue);
        };
        let batches = record.get(BATCHES).and_then(Value::as_array).cloned().unwrap_or_default();
        let (mut sum, mut weight) = (0.0, 0.0);
        for batch in &batches {
            if let Some(v) = batch.get(&self.name).and_then(Value::as_f64) {
                let w = batch.get(self.size_key()).and_then(Value::as_f64).unwrap_or(1.0);
                sum += v * w;
                weight += w;
            }
        }
        if weight > 0.0 {
            record_with_best(net, &self.name, sum / weight, self.lower_is_better)?;
        }
        Ok(CallbackAction::Continue)
    }

    fn get_params(&self) -> Params {
        Params::new()
            .with("name", self.name.as_str())
            .with("lower_is_better", self.lower_is_better)
            .with("on_train", self.on_train)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        check_keys(params, &["name", "lower_is_better", "on_train"], self.type_name())?;
        self.name = params.str_or("name", &self.name)?.to_string();
        self.lower_is_better = params.bool_or("lower_is_better", self.lower_is_better)?;
        self.on_train = params.bool_or("on_train", self.on_train)?;
        Ok(())
    }

    fn type_name(&self) -> &str {
        "PassthroughScoring"
    }
}

/// Scores the model once per epoch on the training or validation data
///
/// With `use_caching` the validation outputs computed during the epoch are
/// reused; otherwise the net runs inference again at epoch end.
#[derive(Debug, Clone)]
pub struct EpochScoring {
    pub name: String,
    pub scoring: Scoring,
    pub lower_is_better: bool,
    pub on_train: bool,
    pub use_caching: bool,
    cache: Vec<(Array2<f32>, Target)>,
}

impl EpochScoring {
    pub fn new(name: impl Into<String>, scoring: Scoring) -> Self {
        Self {
            name: name.into(),
            scoring,
            lower_is_better: false,
            on_train: false,
            use_caching: true,
            cache: Vec::new(),
        }
    }

    pub fn lower_is_better(mut self, lower: bool) -> Self {
        self.lower_is_better = lower;
        self
    }

    pub fn on_train(mut self, on_train: bool) -> Self {
        self.on_train = on_train;
        self
    }

    pub fn use_caching(mut self, use_caching: bool) -> Self {
        self.use_caching = use_caching;
        self
    }

    fn cached(&self) -> Result<Option<(Array2<f32>, Target)>> {
        let Some(((first_pred, first_y), rest)) = self.cache.split_first() else {
            return Ok(None);
        };
        let mut preds = vec![first_pred.view()];
        let mut y = first_y.clone();
        for (pred, target) in rest {
            preds.push(pred.view());
            y = y.concat(target)?;
        }
        let output =
            ndarray::concatenate(Axis(0), &preds).map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        Ok(Some((output, y)))
    }
}

impl Default for EpochScoring {
    fn default() -> Self {
        Self::new("valid_acc", Scoring::Accuracy)
    }
}

impl Callback for EpochScoring {
    fn initialize(&mut self) -> Result<()> {
        self.cache.clear();
        Ok(())
    }

    fn on_epoch_begin(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        self.cache.clear();
        Ok(CallbackAction::Continue)
    }

    fn on_batch_end(&mut self, _net: &mut NeuralNet, batch: &BatchContext<'_>) -> Result<CallbackAction> {
        if self.use_caching && batch.training == self.on_train {
            if let (Some(y_pred), Some(y)) = (batch.y_pred, batch.y) {
                self.cache.push((y_pred.clone(), y.clone()));
            }
        }
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, net: &mut NeuralNet, ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        let dataset = if self.on_train { Some(ctx.dataset_train) } else { ctx.dataset_valid };
        let Some(dataset) = dataset else {
            return Ok(CallbackAction::Continue);
        };
        let scored = match self.cached()? {
            Some(cached) if self.use_caching => Some(cached),
            _ => match dataset.y() {
                Some(y) => Some((net.forward(dataset.x())?, y.clone())),
                None => None,
            },
        };
        self.cache.clear();
        if let Some((output, y)) = scored {
            let score = self.scoring.score(&output, &y)?;
            record_with_best(net, &self.name, score, self.lower_is_better)?;
        }
        Ok(CallbackAction::Continue)
    }

    fn get_params(&self) -> Params {
        Params::new()
            .with("name", self.name.as_str())
            .with("scoring", self.scoring.name())
            .with("lower_is_better", self.lower_is_better)
            .with("on_train", self.on_train)
            .with("use_caching", self.use_caching)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        check_keys(
            params,
            &["name", "scoring", "lower_is_better", "on_train", "use_caching"],
            self.type_name(),
        )?;
        self.name = params.str_or("name", &self.name)?.to_string();
        if let Some(scoring) = params.get("scoring") {
            self.scoring = scoring.as_str().unwrap_or_default().parse()?;
        }
        self.lower_is_better = params.bool_or("lower_is_better", self.lower_is_better)?;
        self.on_train = params.bool_or("on_train", self.on_train)?;
        self.use_caching = params.bool_or("use_caching", self.use_caching)?;
        Ok(())
    }

    fn type_name(&self) -> &str {
        "EpochScoring"
    }
}
