//! The YAML run specification

use super::validate::validate_spec;
use crate::module::MlpFactory;
use crate::net::{ModuleSource, NetKind, NeuralNet};
use crate::params::Params;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A callback added to the net, by built-in type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub params: Params,
}

/// Where a fit writes its results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Module weights (safetensors)
    #[serde(default)]
    pub params: Option<PathBuf>,
    /// History (JSON)
    #[serde(default)]
    pub history: Option<PathBuf>,
}

/// Everything needed to build and fit one net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub kind: NetKind,
    /// `Mlp` settings; `in_features` and `out_features` are required
    pub module: Params,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub callbacks: Vec<CallbackSpec>,
    /// JSON data file, relative paths resolved against the spec's directory
    pub data: PathBuf,
    #[serde(default)]
    pub output: OutputSpec,
}

impl RunSpec {
    /// Net params: `params`, then `module__*` from `module`, then one
    /// `callbacks__<name>` entry per callback plus its sub-params
    pub fn net_params(&self) -> Params {
        let mut params = self.params.clone();
        for (k, v) in self.module.iter() {
            params.insert(format!("module__{k}"), v.clone());
        }
        for cb in &self.callbacks {
            params.insert(format!("callbacks__{}", cb.name), cb.type_name.as_str());
            for (k, v) in cb.params.iter() {
                params.insert(format!("callbacks__{}__{k}", cb.name), v.clone());
            }
        }
        params
    }

    /// Module factory for the spec's kind with the `module` settings as its base
    pub fn module_factory(&self) -> Result<MlpFactory> {
        let in_features = self.module.usize_or("in_features", 0)?;
        let out_features = self.module.usize_or("out_features", 0)?;
        let factory = match self.kind {
            NetKind::Classifier => MlpFactory::classifier(in_features, out_features),
            NetKind::Base | NetKind::Regressor => MlpFactory::regressor(in_features, out_features),
        };
        Ok(MlpFactory { base: factory.base.with_kwargs(&self.module)? })
    }

    /// Make relative data and output paths relative to `dir`
    pub fn resolve_paths(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        resolve(&mut self.data);
        if let Some(p) = self.output.params.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.output.history.as_mut() {
            resolve(p);
        }
    }

    pub fn build_net(&self) -> Result<NeuralNet> {
        let factory = self.module_factory()?;
        NeuralNet::build(self.kind, ModuleSource::Factory(Arc::new(factory)), self.net_params())
    }
}

/// Read, parse and validate a run specification
pub fn load_spec<P: AsRef<Path>>(path: P) -> Result<RunSpec> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read spec file {}: {e}", path.display())))?;
    let mut spec: RunSpec =
        serde_yaml::from_str(&yaml).map_err(|e| Error::Config(format!("Failed to parse YAML spec: {e}")))?;
    if let Some(dir) = path.parent() {
        spec.resolve_paths(dir);
    }
    validate_spec(&spec).map_err(|e| Error::Config(format!("Invalid spec: {e}")))?;
    Ok(spec)
}
