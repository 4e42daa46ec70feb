//! Declarative run configuration and CLI argument types
//!
//! A [`RunSpec`] is a YAML file describing the net kind, the [`Mlp`] module,
//! flat net params (compound keys allowed), extra callbacks, the data file
//! and output paths. It is loaded with [`load_spec`], which validates before
//! returning; CLI flags are applied on top with [`apply_overrides`].
//!
//! ```yaml
//! kind: classifier
//! module:
//!   in_features: 4
//!   out_features: 3
//!   num_units: 16
//! params:
//!   max_epochs: 20
//!   lr: 0.05
//!   optimizer: adam
//! callbacks:
//!   - name: early
//!     type: EarlyStopping
//!     params: { patience: 3 }
//! data: iris.json
//! output:
//!   params: out/model.safetensors
//!   history: out/history.json
//! ```
//!
//! [`Mlp`]: crate::module::Mlp

mod args;
mod data;
mod spec;
mod validate;


pub use args::{
    apply_overrides, parse_args, Cli, Command, FitArgs, HistoryArgs, ScheduleArgs, SchedulePolicy, ValidateArgs,
};
pub use data::{load_data, DataFile, Labels};
pub use spec::{load_spec, CallbackSpec, OutputSpec, RunSpec};
pub use validate::{validate_spec, ValidationError};
