//! skorch: an estimator-style wrapper around neural network training
//!
//! A [`NeuralNet`] owns a module, a criterion, an optimizer and a list of
//! callbacks, and drives them through a fit loop that records every epoch
//! and batch in a [`History`]. Hyperparameters are flat [`Params`] maps;
//! compound keys such as `optimizer__momentum` or `callbacks__print_log__sink`
//! are routed to the component named by their prefix.
//!
//! - [`net`] - the estimator and its classifier/regressor flavours
//! - [`callbacks`] - scoring, early stopping, logging and timing hooks
//! - [`lr_scheduler`] - warm restart and cyclic learning-rate policies
//! - [`model_selection`] - k-fold splits, pipelines and grid search
//! - [`helper`] - [`SliceDict`](helper::SliceDict) for multi-input data
//! - [`likelihood`] - Bernoulli likelihood over Gaussian latent functions
//! - [`config`] / [`cli`] - YAML run specs and the `skorch` binary

pub mod callbacks;
pub mod cli;
pub mod config;
pub mod criterion;
pub mod dataset;
pub mod device;
pub mod error;
pub mod helper;
pub mod history;
pub mod likelihood;
pub mod lr_scheduler;
pub mod model_selection;
pub mod module;
pub mod net;
pub mod optim;
pub mod params;

pub use device::Device;
pub use error::{Error, Result};
pub use history::History;
pub use net::{NeuralNet, NeuralNetClassifier, NeuralNetRegressor};
pub use params::{ParamValue, Params};
