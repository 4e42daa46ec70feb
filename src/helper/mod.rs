//! Containers for passing data to nets and model-selection tools
//!
//! [`SliceDict`] keeps several named arrays that share their first axis, so
//! multi-input data can be split into folds like a single matrix. Anything
//! implementing [`Inputs`] is accepted by
//! [`GridSearchCV`](crate::model_selection::GridSearchCV).

mod inputs;
mod slice_dict;

#[cfg(test)]
mod tests;

pub use inputs::Inputs;
pub use slice_dict::SliceDict;
