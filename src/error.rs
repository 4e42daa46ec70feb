//! Crate-wide error type

use thiserror::Error;

/// Errors raised by the estimator, its components and the CLI
#[derive(Debug, Error)]
pub enum Error {
    /// Constructor received keys that are neither top-level nor routable
    #[error(
        "got unexpected argument(s) {}. Either you made a typo, or you added new arguments \
         in a subclass; if that is the case, the subclass should deal with the new arguments \
         explicitly.",
        .0.join(", ")
    )]
    UnknownArguments(Vec<String>),

    /// `set_params` received a key the estimator does not know
    #[error("Invalid parameter {key} for estimator {estimator}. Check the list of available parameters with `get_params()`.")]
    InvalidParameter { key: String, estimator: String },

    /// A parameter value had the wrong type or range
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("The callback name '{0}' appears more than once.")]
    DuplicateCallbackName(String),

    #[error("Trying to set a parameter for callback {0} which does not exist.")]
    CallbackNotFound(String),

    #[error("Unknown callback type '{0}'")]
    UnknownCallbackType(String),

    /// Operation needs an initialized module
    #[error("{0}")]
    NotInitialized(String),

    #[error("expected {expected} values for {name}, got {got}")]
    LengthMismatch { name: String, expected: usize, got: usize },

    #[error("mode is invalid and scale_fn is None: {0}")]
    InvalidMode(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Trying to pass an initialized Dataset while passing Dataset arguments ({0}) is not allowed.")]
    DatasetArguments(String),

    /// Arrays in a `SliceDict` disagree on their number of rows
    #[error("{0}")]
    SliceDict(String),

    #[error("History error: {0}")]
    History(String),

    #[error("{0}")]
    Likelihood(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(format!("YAML: {e}"))
    }
}
