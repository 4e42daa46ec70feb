//! Datasets, mini-batch iteration and train/validation splitting
//!
//! A [`Dataset`] pairs a feature matrix with an optional [`Target`].
//! [`DataLoader`] walks it in batches, [`CVSplit`] carves off a
//! validation set the way the estimator's `train_split` asks for.

mod data;
mod loader;
mod split;

#[cfg(test)]
mod tests;

pub use data::{Dataset, DatasetFactory, DefaultDatasetFactory, Target};
pub use loader::{Batch, DataLoader, LoaderConfig};
pub use split::CVSplit;
