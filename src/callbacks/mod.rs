//! Training callbacks
//!
//! A net owns an ordered [`CallbackList`]. Every net starts with
//! `epoch_timer`, `train_loss` and `valid_loss` (classifiers add
//! `valid_acc`), followed by user callbacks, and ends with `print_log`.

mod early_stopping;
mod epoch_timer;
mod print_log;
mod registry;
mod scoring;
mod traits;

#[cfg(test)]
mod tests;

pub use early_stopping::EarlyStopping;
pub use epoch_timer::EpochTimer;
pub use print_log::{PrintLog, Sink};
pub use registry::{builtin, CallbackEntry, CallbackList};
pub use scoring::{accuracy, argmax_rows, r2_score, EpochScoring, PassthroughScoring, ScoreFn, Scoring};
pub use traits::{BatchContext, Callback, CallbackAction, CallbackClone, EpochContext};
