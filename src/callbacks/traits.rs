//! Core traits and types for the callback system
//!
//! - `CallbackAction` - what a hook asks the fit loop to do next
//! - `EpochContext` / `BatchContext` - data visible to a hook
//! - `Callback` - the trait all callbacks implement

use crate::dataset::{Dataset, Target};
use crate::net::NeuralNet;
use crate::params::Params;
use crate::Result;
use ndarray::Array2;

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CallbackAction {
    /// Continue training normally
    #[default]
    Continue,
    /// Stop training once the current hook returns
    Stop,
}

impl CallbackAction {
    pub fn is_stop(self) -> bool {
        self == CallbackAction::Stop
    }

    /// `Stop` wins over `Continue`
    pub fn merge(self, other: CallbackAction) -> CallbackAction {
        if self.is_stop() || other.is_stop() {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }
}

/// Datasets of the running fit
#[derive(Clone, Copy, Debug)]
pub struct EpochContext<'a> {
    pub dataset_train: &'a Dataset,
    pub dataset_valid: Option<&'a Dataset>,
}

/// A batch being processed
#[derive(Clone, Copy, Debug)]
pub struct BatchContext<'a> {
    /// `true` for training batches, `false` for validation batches
    pub training: bool,
    pub x: &'a Array2<f32>,
    pub y: Option<&'a Target>,
    /// Module output; only set on batch end
    pub y_pred: Option<&'a Array2<f32>>,
    /// Batch loss; only set on batch end
    pub loss: Option<f32>,
}

/// Logic invoked at fixed points of the fit loop
///
/// All hooks have no-op defaults. Hooks receive the net itself and may read
/// or write its history, optimizer and so on; the net's own bookkeeping for a
/// hook (new history epoch, new batch record) has already happened when a
/// callback's begin hook runs.
pub trait Callback: CallbackClone + Send {
    /// Reset per-fit state; called on every net (re-)initialization
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_train_begin(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    fn on_train_end(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_epoch_begin(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    fn on_batch_begin(&mut self, _net: &mut NeuralNet, _batch: &BatchContext<'_>) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    fn on_batch_end(&mut self, _net: &mut NeuralNet, _batch: &BatchContext<'_>) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Configurable parameters, reachable as `callbacks__<name>__<key>`
    fn get_params(&self) -> Params {
        Params::new()
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        match params.keys().next() {
            None => Ok(()),
            Some(key) => Err(crate::Error::InvalidParameter {
                key: key.to_string(),
                estimator: self.type_name().to_string(),
            }),
        }
    }

    /// Type name; also the registry name of unnamed callbacks
    fn type_name(&self) -> &str;
}

pub trait CallbackClone {
    fn clone_box(&self) -> Box<dyn Callback>;
}

impl<T: Callback + Clone + 'static> CallbackClone for T {
    fn clone_box(&self) -> Box<dyn Callback> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Callback> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Reject keys outside `allowed`, naming the callback type
pub(crate) fn check_keys(params: &Params, allowed: &[&str], type_name: &str) -> Result<()> {
    match params.keys().find(|k| !allowed.contains(k)) {
        None => Ok(()),
        Some(key) => Err(crate::Error::InvalidParameter {
            key: key.to_string(),
            estimator: type_name.to_string(),
        }),
    }
}
