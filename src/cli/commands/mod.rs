//! CLI command implementations

mod fit;
mod history;
mod schedule;
mod validate;

#[cfg(test)]
mod tests;

pub use fit::fit_from_spec;
pub use history::query_history;
pub use schedule::{format_schedule, schedule_values};

use crate::cli::LogLevel;
use crate::config::{Cli, Command};
use crate::Result;

/// Execute a parsed command line
pub fn run_command(cli: Cli) -> Result<()> {
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);
    match cli.command {
        Command::Fit(args) => fit::run_fit(&args, level),
        Command::Validate(args) => validate::run_validate(&args, level),
        Command::Schedule(args) => schedule::run_schedule(&args),
        Command::History(args) => history::run_history(&args),
    }
}
