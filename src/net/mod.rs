//! The estimator: a module trained by a callback-driven fit loop
//!
//! - [`NeuralNet`] - lifecycle (`initialize`, `fit`, `partial_fit`), params,
//!   prediction and persistence
//! - [`NeuralNetClassifier`] / [`NeuralNetRegressor`] - task-specific defaults
//!
//! # Example
//!
//! ```
//! use ndarray::Array2;
//! use skorch::dataset::Target;
//! use skorch::module::MlpFactory;
//! use skorch::net::NeuralNetClassifier;
//! use skorch::params::Params;
//!
//! let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 3 + j) % 7) as f32 / 7.0);
//! let y = Target::from((0..40).map(|i| i % 2).collect::<Vec<usize>>());
//! let params = Params::new().with("max_epochs", 2).with("verbose", 0).with("lr", 0.1);
//! let mut net = NeuralNetClassifier::new(MlpFactory::classifier(3, 2), params).unwrap();
//! net.fit(&x, &y).unwrap();
//! assert_eq!(net.history().len(), 2);
//! assert_eq!(net.predict(&x).unwrap().len(), 40);
//! ```

mod classifier;
mod core;
mod fit;
mod init;
mod params;
mod persist;
mod predict;
mod regressor;

#[cfg(test)]
mod tests;

pub use classifier::NeuralNetClassifier;
pub use self::core::{ModuleSource, NetConfig, NetKind, NeuralNet, PREFIXES, TOP_LEVEL_KEYS};
pub use regressor::NeuralNetRegressor;
