//! Module and module-factory traits

use super::parameter::{Parameter, StateDict};
use crate::params::Params;
use crate::{Error, Result};
use ndarray::Array2;

/// A trainable function of a batch of row vectors
///
/// `forward` caches whatever `backward` needs; `backward` adds the parameter
/// gradients for the most recent `forward` into each `Parameter::grad`.
pub trait Module: ModuleClone + Send {
    /// Compute outputs for a `(batch, features)` input
    fn forward(&mut self, x: &Array2<f32>, training: bool) -> Result<Array2<f32>>;

    /// Accumulate gradients given dLoss/dOutput of the last forward pass
    fn backward(&mut self, grad_output: &Array2<f32>) -> Result<()>;

    /// Parameters in a stable order, named with dotted paths
    fn parameters(&self) -> Vec<(String, &Parameter)>;

    fn parameters_mut(&mut self) -> Vec<(String, &mut Parameter)>;

    fn zero_grad(&mut self) {
        for (_, param) in self.parameters_mut() {
            param.zero_grad();
        }
    }

    fn state_dict(&self) -> StateDict {
        self.parameters()
            .into_iter()
            .map(|(name, p)| (name, p.data.clone()))
            .collect()
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        state.copy_into(self.parameters_mut())
    }

    /// Build a fresh module from this one's configuration plus `kwargs`
    fn rebuild(&self, kwargs: &Params, _seed: u64) -> Result<Box<dyn Module>> {
        Err(Error::Config(format!(
            "{} cannot be re-initialized with {kwargs}",
            self.describe()
        )))
    }

    /// One-line description used in the estimator's repr
    fn describe(&self) -> String {
        "Module".to_string()
    }
}

/// Object-safe cloning for boxed modules
pub trait ModuleClone {
    fn clone_box(&self) -> Box<dyn Module>;
}

impl<T: Module + Clone + 'static> ModuleClone for T {
    fn clone_box(&self) -> Box<dyn Module> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Module> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Constructs modules from routed `module__*` parameters
pub trait ModuleFactory: Send + Sync {
    fn build(&self, kwargs: &Params, seed: u64) -> Result<Box<dyn Module>>;

    /// Name shown in the estimator's repr
    fn name(&self) -> String;
}
