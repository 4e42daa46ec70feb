//! Named, ordered callback slots

use super::early_stopping::EarlyStopping;
use super::epoch_timer::EpochTimer;
use super::print_log::PrintLog;
use super::scoring::{EpochScoring, PassthroughScoring};
use super::traits::Callback;
use crate::lr_scheduler::LRScheduler;
use crate::params::{split_key, ParamValue, Params};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};

/// Instantiate a built-in callback from its type name
pub fn builtin(type_name: &str) -> Result<Box<dyn Callback>> {
    Ok(match type_name {
        "EpochTimer" => Box::new(EpochTimer::new()),
        "PrintLog" => Box::new(PrintLog::new()),
        "EarlyStopping" => Box::new(EarlyStopping::default()),
        "EpochScoring" => Box::new(EpochScoring::default()),
        "PassthroughScoring" => Box::new(PassthroughScoring::default()),
        "LRScheduler" => Box::new(LRScheduler::default()),
        other => return Err(Error::UnknownCallbackType(other.to_string())),
    })
}

/// One slot; `callback` is `None` when disabled
#[derive(Clone)]
pub struct CallbackEntry {
    pub name: String,
    pub callback: Option<Box<dyn Callback>>,
}

/// Callbacks in firing order
#[derive(Clone, Default)]
pub struct CallbackList {
    entries: Vec<CallbackEntry>,
}

impl CallbackList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, callback: Box<dyn Callback>) {
        self.entries.push(CallbackEntry { name: name.into(), callback: Some(callback) });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallbackEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CallbackEntry> {
        self.entries.iter_mut()
    }

    /// Active callback by name
    pub fn get(&self, name: &str) -> Option<&dyn Callback> {
        self.entries.iter().find(|e| e.name == name)?.callback.as_deref()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Callback>> {
        self.entries.iter_mut().find(|e| e.name == name)?.callback.as_mut()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name && e.callback.is_none())
    }

    pub fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::DuplicateCallbackName(entry.name.clone()));
            }
        }
        Ok(())
    }

    /// Replace, disable or add the slot `name`
    pub fn set_slot(&mut self, name: &str, callback: Option<Box<dyn Callback>>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.callback = callback,
            None => self.entries.push(CallbackEntry { name: name.to_string(), callback }),
        }
    }

    /// Apply `callbacks__*` parameters (prefix already stripped)
    ///
    /// `name = null` disables a slot, `name = "Type"` installs a built-in,
    /// `name__key = value` is forwarded to that callback's `set_params`.
    pub fn apply_params(&mut self, params: &Params) -> Result<()> {
        let mut nested: BTreeMap<&str, Params> = BTreeMap::new();
        let mut order: Vec<&str> = Vec::new();
        for (key, value) in params.iter() {
            match split_key(key) {
                (name, None) => match value {
                    ParamValue::Null => self.set_slot(name, None),
                    ParamValue::Str(type_name) => self.set_slot(name, Some(builtin(type_name)?)),
                    other => {
                        return Err(Error::InvalidValue {
                            key: format!("callbacks__{name}"),
                            reason: format!("expected None or a callback type name, got {other}"),
                        })
                    }
                },
                (name, Some(rest)) => {
                    if !nested.contains_key(name) {
                        order.push(name);
                    }
                    nested.entry(name).or_default().insert(rest, value.clone());
                }
            }
        }
        for name in order {
            let sub = nested.remove(name).unwrap_or_default();
            let callback = self
                .get_mut(name)
                .ok_or_else(|| Error::CallbackNotFound(name.to_string()))?;
            callback.set_params(&sub)?;
        }
        Ok(())
    }

    pub fn initialize_all(&mut self) -> Result<()> {
        for entry in &mut self.entries {
            if let Some(cb) = entry.callback.as_mut() {
                cb.initialize()?;
            }
        }
        Ok(())
    }

    /// `name__key` for every active callback's parameters
    pub fn params(&self) -> Params {
        let mut out = Params::new();
        for entry in &self.entries {
            if let Some(cb) = &entry.callback {
                for (key, value) in cb.get_params().iter() {
                    out.insert(format!("{}__{key}", entry.name), value.clone());
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for CallbackList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| {
                (e.name.as_str(), e.callback.as_ref().map_or("None", |cb| cb.type_name()))
            }))
            .finish()
    }
}
