//! skorch CLI
//!
//! # Usage
//!
//! ```bash
//! # Fit from a run spec
//! skorch fit run.yaml
//!
//! # Fit with overrides
//! skorch fit run.yaml --epochs 20 --lr 0.05
//!
//! # Check a spec without fitting
//! skorch validate run.yaml
//!
//! # Print a learning-rate schedule
//! skorch schedule warm-restart --steps 30 --base-period 5
//!
//! # Query a saved history
//! skorch history out/history.json -1,valid_loss
//! ```

use clap::Parser;
use skorch::cli::{init_tracing, run_command, Cli, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
