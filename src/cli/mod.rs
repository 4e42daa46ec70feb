//! Command handlers for the `skorch` binary

mod commands;
mod logging;

pub use commands::{fit_from_spec, format_schedule, query_history, run_command, schedule_values};
pub use logging::{init_tracing, LogLevel};

pub use crate::config::Cli;
