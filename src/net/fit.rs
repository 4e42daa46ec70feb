//! Fitting: `fit`, `partial_fit` and the callback-driven epoch loop

use super::core::{not_initialized, NetKind, NeuralNet};
use crate::callbacks::{BatchContext, Callback, CallbackAction, EpochContext};
use crate::dataset::{Batch, DataLoader, Dataset, LoaderConfig, Target};
use crate::{Error, Result};
use ndarray::Array2;
use std::borrow::Cow;
use tracing::{debug, info};

impl NeuralNet {
    /// Initialize (unless warm-starting an initialized net) and train for
    /// `max_epochs`
    pub fn fit(&mut self, x: &Array2<f32>, y: Option<&Target>) -> Result<&mut Self> {
        let dataset = self.get_dataset(x, y)?;
        self.fit_prepared(dataset)
    }

    /// Like [`fit`](Self::fit) for a ready-made dataset
    ///
    /// `dataset__*` params only apply to datasets the net builds itself, so
    /// combining them with a prebuilt dataset is an error.
    pub fn fit_dataset(&mut self, dataset: Dataset) -> Result<&mut Self> {
        self.check_no_dataset_args()?;
        self.fit_prepared(dataset)
    }

    /// Train for `max_epochs` more epochs, initializing only if needed
    pub fn partial_fit(&mut self, x: &Array2<f32>, y: Option<&Target>) -> Result<&mut Self> {
        let dataset = self.get_dataset(x, y)?;
        if !self.initialized {
            self.initialize()?;
        }
        self.fit_loop(&dataset, None)?;
        Ok(self)
    }

    pub fn partial_fit_dataset(&mut self, dataset: Dataset) -> Result<&mut Self> {
        self.check_no_dataset_args()?;
        if !self.initialized {
            self.initialize()?;
        }
        self.fit_loop(&dataset, None)?;
        Ok(self)
    }

    fn fit_prepared(&mut self, dataset: Dataset) -> Result<&mut Self> {
        if !(self.config.warm_start && self.initialized) {
            self.initialize()?;
        }
        self.fit_loop(&dataset, None)?;
        Ok(self)
    }

    /// Build a dataset from raw arrays with the dataset factory and
    /// `dataset__*` params
    pub fn get_dataset(&self, x: &Array2<f32>, y: Option<&Target>) -> Result<Dataset> {
        self.dataset_fn.build(x.clone(), y.cloned(), &self.params.prefixed("dataset"))
    }

    fn check_no_dataset_args(&self) -> Result<()> {
        let kwargs = self.params.prefixed("dataset");
        if kwargs.is_empty() {
            return Ok(());
        }
        let keys: Vec<&str> = kwargs.keys().collect();
        Err(Error::DatasetArguments(keys.join(", ")))
    }

    /// Train and validation parts of `dataset` according to `train_split`
    ///
    /// Classifiers stratify the split by label.
    pub fn split_dataset<'d>(&self, dataset: &'d Dataset) -> Result<(Cow<'d, Dataset>, Option<Dataset>)> {
        match self.config.train_split {
            None => Ok((Cow::Borrowed(dataset), None)),
            Some(split) => {
                let stratified = self.kind == NetKind::Classifier;
                let (train, valid) = split.split(dataset, stratified)?;
                Ok((Cow::Owned(train), Some(valid)))
            }
        }
    }

    /// Run `epochs` (default `max_epochs`) epochs over `dataset`
    ///
    /// Hook order per fit: `on_train_begin`, then per epoch `on_epoch_begin`,
    /// `on_batch_begin`/`on_batch_end` around every training batch and then
    /// every validation batch, `on_epoch_end`; finally `on_train_end`, which
    /// also fires when a callback stops training early.
    pub fn fit_loop(&mut self, dataset: &Dataset, epochs: Option<usize>) -> Result<()> {
        if !self.initialized {
            return Err(self.not_initialized());
        }
        if dataset.y().is_none() {
            return Err(Error::InvalidValue {
                key: "y".into(),
                reason: "training needs targets".into(),
            });
        }
        let epochs = epochs.unwrap_or(self.config.max_epochs);
        let (train, valid) = self.split_dataset(dataset)?;
        let train_cfg =
            LoaderConfig::from_params(self.config.batch_size, true, &self.params.prefixed("iterator_train"))?;
        let valid_cfg =
            LoaderConfig::from_params(self.config.batch_size, false, &self.params.prefixed("iterator_valid"))?;
        let ctx = EpochContext { dataset_train: &train, dataset_valid: valid.as_ref() };
        debug!(epochs, n_train = train.len(), n_valid = valid.as_ref().map_or(0, Dataset::len), "fit loop");

        let mut action = self.notify(|cb, net| cb.on_train_begin(net, &ctx))?;
        let mut epoch = 0;
        while epoch < epochs && !action.is_stop() {
            action = self.run_epoch(&ctx, train_cfg, valid_cfg)?;
            epoch += 1;
        }
        if action.is_stop() {
            info!(epochs_run = epoch, "training stopped by a callback");
        }
        self.notify(|cb, net| cb.on_train_end(net, &ctx).map(|()| CallbackAction::Continue))?;
        Ok(())
    }

    fn run_epoch(
        &mut self,
        ctx: &EpochContext<'_>,
        train_cfg: LoaderConfig,
        valid_cfg: LoaderConfig,
    ) -> Result<CallbackAction> {
        self.history.new_epoch();
        let epoch = self.history.len();
        self.history.record("epoch", epoch)?;
        let action = self.notify(|cb, net| cb.on_epoch_begin(net, ctx))?;
        if action.is_stop() {
            return Ok(action);
        }

        let loader = DataLoader::new(ctx.dataset_train, train_cfg, &mut self.rng);
        for batch in loader {
            if self.run_batch(&batch, true)?.is_stop() {
                return Ok(CallbackAction::Stop);
            }
        }
        if let Some(valid) = ctx.dataset_valid {
            let loader = DataLoader::new(valid, valid_cfg, &mut self.rng);
            for batch in loader {
                if self.run_batch(&batch, false)?.is_stop() {
                    return Ok(CallbackAction::Stop);
                }
            }
        }
        self.notify(|cb, net| cb.on_epoch_end(net, ctx))
    }

    fn run_batch(&mut self, batch: &Batch, training: bool) -> Result<CallbackAction> {
        let y = batch.y.as_ref().ok_or_else(|| Error::InvalidValue {
            key: "y".into(),
            reason: "batch without targets".into(),
        })?;
        self.history.new_batch()?;
        let begin = BatchContext { training, x: &batch.x, y: Some(y), y_pred: None, loss: None };
        if self.notify(|cb, net| cb.on_batch_begin(net, &begin))?.is_stop() {
            return Ok(CallbackAction::Stop);
        }

        let (loss, y_pred) = if training {
            self.train_step(&batch.x, y)?
        } else {
            self.validation_step(&batch.x, y)?
        };
        let prefix = if training { "train" } else { "valid" };
        self.history.record_batch(format!("{prefix}_loss"), f64::from(loss))?;
        self.history.record_batch(format!("{prefix}_batch_size"), batch.len())?;

        let end = BatchContext { training, x: &batch.x, y: Some(y), y_pred: Some(&y_pred), loss: Some(loss) };
        self.notify(|cb, net| cb.on_batch_end(net, &end))
    }

    /// One optimization step: forward in training mode, loss, backward,
    /// parameter update
    pub fn train_step(&mut self, x: &Array2<f32>, y: &Target) -> Result<(f32, Array2<f32>)> {
        let kind = self.kind;
        let (Some(module), Some(criterion), Some(optimizer)) =
            (self.module.as_mut(), self.criterion.as_ref(), self.optimizer.as_mut())
        else {
            return Err(not_initialized(kind));
        };
        let y_pred = module.forward(x, true)?;
        let (loss, grad) = criterion.forward(&y_pred, y)?;
        module.zero_grad();
        module.backward(&grad)?;
        optimizer.step(module.parameters_mut())?;
        Ok((loss, y_pred))
    }

    /// Loss of a batch in evaluation mode, without updating parameters
    pub fn validation_step(&mut self, x: &Array2<f32>, y: &Target) -> Result<(f32, Array2<f32>)> {
        let kind = self.kind;
        let (Some(module), Some(criterion)) = (self.module.as_mut(), self.criterion.as_ref()) else {
            return Err(not_initialized(kind));
        };
        let y_pred = module.forward(x, false)?;
        let (loss, _) = criterion.forward(&y_pred, y)?;
        Ok((loss, y_pred))
    }

    /// Run a hook on every active callback in order
    ///
    /// The callback list is moved out while the hooks run so each hook can
    /// borrow the net mutably. All callbacks see the hook even if an earlier
    /// one asked to stop.
    pub(crate) fn notify<F>(&mut self, mut hook: F) -> Result<CallbackAction>
    where
        F: FnMut(&mut dyn Callback, &mut NeuralNet) -> Result<CallbackAction>,
    {
        let mut callbacks = std::mem::take(&mut self.callbacks);
        let mut outcome = Ok(CallbackAction::Continue);
        for entry in callbacks.iter_mut() {
            let Some(callback) = entry.callback.as_mut() else {
                continue;
            };
            match hook(callback.as_mut(), self) {
                Ok(action) => outcome = outcome.map(|a| a.merge(action)),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.callbacks = callbacks;
        outcome
    }
}
