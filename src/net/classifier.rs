//! Classification flavour of the net

use super::core::{ModuleSource, NetKind, NeuralNet};
use crate::callbacks::Callback;
use crate::criterion::CriterionFactory;
use crate::dataset::{DatasetFactory, Target};
use crate::module::{Module, ModuleFactory};
use crate::optim::OptimizerFactory;
use crate::params::Params;
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Net for class labels
///
/// Differs from [`NeuralNet`] in its defaults: `NLLLoss` as criterion, a
/// `valid_acc` scoring callback, a stratified train/validation split, and
/// `predict` returning labels. Everything else is reached through `Deref`.
#[derive(Clone, Debug)]
pub struct NeuralNetClassifier(NeuralNet);

impl NeuralNetClassifier {
    pub fn new(factory: impl ModuleFactory + 'static, params: Params) -> Result<Self> {
        NeuralNet::build(NetKind::Classifier, ModuleSource::Factory(Arc::new(factory)), params).map(Self)
    }

    pub fn from_module(module: Box<dyn Module>, params: Params) -> Result<Self> {
        NeuralNet::build(NetKind::Classifier, ModuleSource::Instance(module), params).map(Self)
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
        check_labels(y)?;
        self.0.fit(x, Some(y))?;
        Ok(self)
    }

    pub fn partial_fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<&mut Self> {
        check_labels(y)?;
        self.0.partial_fit(x, Some(y))?;
        Ok(self)
    }

    /// Predicted label per row
    pub fn predict(&mut self, x: &Array2<f32>) -> Result<Array1<usize>> {
        self.0.predict_classes(x)
    }
}

fn check_labels(y: &Target) -> Result<()> {
    match y {
        Target::Classes(_) => Ok(()),
        Target::Values(_) => Err(Error::InvalidValue {
            key: "y".into(),
            reason: "NeuralNetClassifier expects class labels".into(),
        }),
    }
}

impl Deref for NeuralNetClassifier {
    type Target = NeuralNet;

    fn deref(&self) -> &NeuralNet {
        &self.0
    }
}

impl DerefMut for NeuralNetClassifier {
    fn deref_mut(&mut self) -> &mut NeuralNet {
        &mut self.0
    }
}

impl fmt::Display for NeuralNetClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
