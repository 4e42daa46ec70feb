//! `get_params` / `set_params` and the re-initialization rules

use super::core::{NetConfig, NeuralNet, PREFIXES, TOP_LEVEL_KEYS};
use crate::callbacks::Callback;
use crate::params::{route, split_key, Params};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

impl NeuralNet {
    /// All parameters: top-level values (defaults filled in), stored compound
    /// keys, and every active callback's params as
    /// `callbacks__<name>__<param>`
    pub fn get_params(&self) -> Params {
        let mut out = NetConfig::defaults();
        out.insert("criterion", self.criterion_factory().name());
        out.insert("optimizer", self.optimizer_factory().name());
        out.extend(&self.params);
        let callbacks = if self.initialized {
            Some(self.callbacks.params())
        } else {
            self.callback_list().ok().map(|list| list.params())
        };
        if let Some(callbacks) = callbacks {
            for (key, value) in callbacks.iter() {
                out.insert(format!("callbacks__{key}"), value.clone());
            }
        }
        out
    }

    /// Update parameters; on an initialized net the affected components are
    /// rebuilt
    ///
    /// - `module__*` rebuilds the module and the optimizer
    /// - `optimizer__*`, `optimizer` or `lr` rebuild the optimizer
    /// - `criterion__*` or `criterion` rebuild the criterion
    /// - `callbacks__*` re-initializes the callbacks
    ///
    /// Nothing changes if any key is unknown or any value is invalid.
    pub fn set_params(&mut self, params: &Params) -> Result<&mut Self> {
        let routed = route(params, &TOP_LEVEL_KEYS, &PREFIXES);
        if let Some(key) = routed.unknown.first() {
            return Err(Error::InvalidParameter {
                key: key.clone(),
                estimator: self.kind.name().to_string(),
            });
        }

        let mut merged = self.params.clone();
        // a new slot value drops the slot's stored params, not ones passed alongside it
        for key in params.keys() {
            if let ("callbacks", Some(rest)) = split_key(key) {
                if split_key(rest).1.is_none() {
                    merged.remove_prefixed(key);
                }
            }
        }
        merged.extend(params);
        let config = NetConfig::from_params(&merged.top_level())?;
        let callbacks_changed = routed.by_prefix.contains_key("callbacks");
        if callbacks_changed {
            self.callback_list_with(&merged)?;
        }

        if routed.top.contains_key("seed") {
            self.rng = StdRng::seed_from_u64(config.seed);
        }
        self.params = merged;
        self.config = config;
        if !self.initialized {
            return Ok(self);
        }

        let touched = |name: &str| routed.by_prefix.contains_key(name) || routed.top.contains_key(name);
        if routed.by_prefix.contains_key("module") {
            debug!(net = self.kind.name(), "re-initializing module and optimizer");
            self.initialize_module()?;
            self.initialize_optimizer()?;
        } else if touched("optimizer") || routed.top.contains_key("lr") {
            debug!(net = self.kind.name(), "re-initializing optimizer");
            self.initialize_optimizer()?;
        }
        if touched("criterion") {
            self.initialize_criterion()?;
        }
        if callbacks_changed {
            self.initialize_callbacks()?;
        }
        Ok(self)
    }

    /// Replace, add or (with `None`) disable the callback slot `name`
    ///
    /// Stored `callbacks__<name>__*` params are dropped; the new instance
    /// carries its own configuration.
    pub fn set_callback(&mut self, name: &str, callback: Option<Box<dyn Callback>>) -> Result<&mut Self> {
        let key = format!("callbacks__{name}");
        self.params.remove(&key);
        self.params.remove_prefixed(&key);
        match self.slot_overrides.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = callback,
            None => self.slot_overrides.push((name.to_string(), callback)),
        }
        if self.initialized {
            self.initialize_callbacks()?;
        }
        Ok(self)
    }
}
