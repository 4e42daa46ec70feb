//! Checks run on a spec before anything is built

use super::spec::RunSpec;
use crate::callbacks::builtin;
use crate::net::{PREFIXES, TOP_LEVEL_KEYS};
use crate::params::route;
use std::collections::HashSet;

/// Problems found in a [`RunSpec`]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("module.{0} is required and must be a positive integer")]
    MissingModuleKey(&'static str),

    #[error("unknown params: {}", .0.join(", "))]
    UnknownParams(Vec<String>),

    #[error("module settings belong under `module`, not params: {0}")]
    ModuleInParams(String),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f64),

    #[error("Invalid batch size: {0} (must be > 0 or -1)")]
    InvalidBatchSize(i64),

    #[error("Invalid max_epochs: {0}")]
    InvalidEpochs(String),

    #[error("The callback name '{0}' appears more than once.")]
    DuplicateCallback(String),

    #[error("Unknown callback type '{type_name}' for callback '{name}'")]
    UnknownCallbackType { name: String, type_name: String },

    #[error("data path is empty")]
    MissingData,
}

pub fn validate_spec(spec: &RunSpec) -> Result<(), ValidationError> {
    for key in ["in_features", "out_features"] {
        match spec.module.get(key).and_then(|v| v.as_i64()) {
            Some(n) if n > 0 => {}
            _ => return Err(ValidationError::MissingModuleKey(key)),
        }
    }

    let routed = route(&spec.params, &TOP_LEVEL_KEYS, &PREFIXES);
    if !routed.unknown.is_empty() {
        return Err(ValidationError::UnknownParams(routed.unknown));
    }
    if let Some(key) = spec.params.keys().find(|k| k.starts_with("module__")) {
        return Err(ValidationError::ModuleInParams(key.to_string()));
    }
    if let Some(lr) = spec.params.get("lr") {
        match lr.as_f64() {
            Some(lr) if lr > 0.0 => {}
            other => return Err(ValidationError::InvalidLearningRate(other.unwrap_or(f64::NAN))),
        }
    }
    if let Some(bs) = spec.params.get("batch_size") {
        match bs.as_i64() {
            Some(bs) if bs > 0 || bs == -1 => {}
            other => return Err(ValidationError::InvalidBatchSize(other.unwrap_or(0))),
        }
    }
    if let Some(epochs) = spec.params.get("max_epochs") {
        if !epochs.as_i64().is_some_and(|e| e >= 0) {
            return Err(ValidationError::InvalidEpochs(epochs.to_string()));
        }
    }

    let mut seen = HashSet::new();
    for cb in &spec.callbacks {
        if !seen.insert(cb.name.as_str()) {
            return Err(ValidationError::DuplicateCallback(cb.name.clone()));
        }
        if builtin(&cb.type_name).is_err() {
            return Err(ValidationError::UnknownCallbackType {
                name: cb.name.clone(),
                type_name: cb.type_name.clone(),
            });
        }
    }

    if spec.data.as_os_str().is_empty() {
        return Err(ValidationError::MissingData);
    }
    Ok(())
}
