//! Cross-validation, grid search and pipelines over estimators
//!
//! - [`Estimator`] - the fit/predict/score/params contract nets implement
//! - [`KFold`] - (stratified) k-fold index splits
//! - [`GridSearchCV`] - exhaustive search over a [`ParamGrid`]
//! - [`Pipeline`] - transformer steps followed by an estimator, with
//!   `step__key` parameter routing

mod estimator;
mod grid_search;
mod kfold;
mod pipeline;
mod scaler;


pub use estimator::Estimator;
pub use grid_search::{CvResult, GridSearchCV, ParamGrid};
pub use kfold::{Fold, KFold};
pub use pipeline::{Pipeline, Transformer};
pub use scaler::StandardScaler;
