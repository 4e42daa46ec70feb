//! Initialization of callbacks, criterion, module and optimizer

use super::core::{ModuleSource, NetKind, NeuralNet};
use crate::callbacks::{CallbackList, EpochScoring, EpochTimer, PassthroughScoring, PrintLog, Scoring};
use crate::history::History;
use crate::params::Params;
use crate::Result;
use rand::Rng;
use tracing::{debug, info};

impl NeuralNet {
    /// Build every component from the current params and start a fresh
    /// history
    ///
    /// Each call draws a new module seed from the net's generator, so
    /// re-initializing yields different starting weights.
    pub fn initialize(&mut self) -> Result<&mut Self> {
        self.initialize_callbacks()?;
        self.initialize_criterion()?;
        self.initialize_module()?;
        self.initialize_optimizer()?;
        self.history = History::new();
        self.initialized = true;
        debug!(net = self.kind.name(), device = %self.device, "initialized");
        Ok(self)
    }

    /// Callbacks every net of this kind starts with, before user callbacks
    fn default_callbacks(&self) -> CallbackList {
        let mut list = CallbackList::new();
        list.push("epoch_timer", Box::new(EpochTimer::new()));
        list.push("train_loss", Box::new(PassthroughScoring::new("train_loss", true)));
        list.push("valid_loss", Box::new(PassthroughScoring::new("valid_loss", false)));
        if self.kind == NetKind::Classifier {
            list.push("valid_acc", Box::new(EpochScoring::new("valid_acc", Scoring::Accuracy)));
        }
        list
    }

    /// Defaults, user callbacks, `print_log`, then slot replacements and
    /// stored `callbacks__*` params
    pub(crate) fn callback_list(&self) -> Result<CallbackList> {
        self.callback_list_with(&self.params)
    }

    /// Same as [`callback_list`](Self::callback_list) for candidate params
    pub(crate) fn callback_list_with(&self, params: &Params) -> Result<CallbackList> {
        let mut list = self.default_callbacks();
        for (name, callback) in &self.user_callbacks {
            list.push(name.clone(), callback.clone());
        }
        list.push("print_log", Box::new(PrintLog::new()));
        list.check_unique()?;
        for (name, callback) in &self.slot_overrides {
            list.set_slot(name, callback.clone());
        }
        list.apply_params(&params.prefixed("callbacks"))?;
        Ok(list)
    }

    pub(crate) fn initialize_callbacks(&mut self) -> Result<()> {
        let mut list = self.callback_list()?;
        list.initialize_all()?;
        self.callbacks = list;
        Ok(())
    }

    pub(crate) fn initialize_criterion(&mut self) -> Result<()> {
        let kwargs = self.params.prefixed("criterion");
        self.criterion = Some(self.criterion_factory().build(&kwargs)?);
        Ok(())
    }

    pub(crate) fn initialize_module(&mut self) -> Result<()> {
        let kwargs = self.params.prefixed("module");
        let seed: u64 = self.rng.random();
        let module = match &self.module_fn {
            ModuleSource::Factory(factory) => factory.build(&kwargs, seed)?,
            ModuleSource::Instance(module) if kwargs.is_empty() => module.clone(),
            ModuleSource::Instance(module) => {
                info!(module = %module.describe(), %kwargs, "Re-initializing module!");
                if self.config.verbose > 0 {
                    println!("Re-initializing module!");
                }
                module.rebuild(&kwargs, seed)?
            }
        };
        self.device = self.config.device.resolve();
        self.module = Some(module);
        Ok(())
    }

    pub(crate) fn initialize_optimizer(&mut self) -> Result<()> {
        let module = self.module.as_ref().ok_or_else(|| self.not_initialized())?;
        let names: Vec<String> = module.parameters().into_iter().map(|(name, _)| name).collect();
        let kwargs = self.params.prefixed("optimizer");
        self.optimizer = Some(self.optimizer_factory().build(&names, &kwargs, self.config.lr)?);
        Ok(())
    }
}
