//! Regression flavour of the net

use super::core::{ModuleSource, NetKind, NeuralNet};
use crate::callbacks::Callback;
use crate::criterion::CriterionFactory;
use crate::dataset::{DatasetFactory, Target};
use crate::module::{Module, ModuleFactory};
use crate::optim::OptimizerFactory;
use crate::params::Params;
use crate::Result;
use ndarray::Array2;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Net for real-valued targets: `MSELoss` by default, scored with R²
#[derive(Clone, Debug)]
pub struct NeuralNetRegressor(NeuralNet);

impl NeuralNetRegressor {
    pub fn new(factory: impl ModuleFactory + 'static, params: Params) -> Result<Self> {
        NeuralNet::build(NetKind::Regressor, ModuleSource::Factory(Arc::new(factory)), params).map(Self)
    }

    pub fn from_module(module: Box<dyn Module>, params: Params) -> Result<Self> {
        NeuralNet::build(NetKind::Regressor, ModuleSource::Instance(module), params).map(Self)
    }

    pub fn with_callback(self, name: impl Into<String>, callback: impl Callback + 'static) -> Self {
        Self(self.0.with_callback(name, callback))
    }

    pub fn add_callback(self, callback: impl Callback + 'static) -> Self {
        Self(self.0.add_callback(callback))
    }

    pub fn with_criterion(self, factory: impl CriterionFactory + 'static) -> Self {
        Self(self.0.with_criterion(factory))
    }

    pub fn with_optimizer(self, factory: impl OptimizerFactory + 'static) -> Self {
        Self(self.0.with_optimizer(factory))
    }

    pub fn with_dataset(self, factory: impl DatasetFactory + 'static) -> Self {
        Self(self.0.with_dataset(factory))
    }

    pub fn into_inner(self) -> NeuralNet {
        self.0
    }

    pub fn clone_unfitted(&self) -> Self {
        Self(self.0.clone_unfitted())
    }

    pub fn fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<&mut Self> {
        self.0.fit(x, Some(y))?;
        Ok(self)
    }

    pub fn partial_fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<&mut Self> {
        self.0.partial_fit(x, Some(y))?;
        Ok(self)
    }
}

impl Deref for NeuralNetRegressor {
    type Target = NeuralNet;

    fn deref(&self) -> &NeuralNet {
        &self.0
    }
}

impl DerefMut for NeuralNetRegressor {
    fn deref_mut(&mut self) -> &mut NeuralNet {
        &mut self.0
    }
}

impl fmt::Display for NeuralNetRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
