//! Trainable modules
//!
//! The estimator does not differentiate anything itself: a [`Module`] owns its
//! parameters, computes outputs in `forward` and accumulates parameter
//! gradients in `backward`. [`Mlp`] is the bundled reference module.

mod mlp;
mod parameter;
mod traits;

pub use mlp::{Mlp, MlpConfig, MlpFactory, Nonlinearity, OutputActivation};
pub use parameter::{Parameter, StateDict};
pub use traits::{Module, ModuleClone, ModuleFactory};
