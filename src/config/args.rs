//! Command-line arguments

use super::spec::RunSpec;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// skorch: train neural nets through an estimator interface
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "skorch")]
#[command(version)]
#[command(about = "Fit neural nets from YAML run specs, inspect histories and learning-rate schedules")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fit a net described by a run spec
    Fit(FitArgs),

    /// Check a run spec without fitting
    Validate(ValidateArgs),

    /// Print the learning rates a scheduler produces
    Schedule(ScheduleArgs),

    /// Query a saved history file
    History(HistoryArgs),
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct FitArgs {
    /// Path to the YAML run spec
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// Override max_epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override the learning rate
    #[arg(short, long)]
    pub lr: Option<f64>,

    /// Override the batch size
    #[arg(short, long, allow_negative_numbers = true)]
    pub batch_size: Option<i64>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Build and initialize the net, but do not fit
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Cosine annealing with warm restarts, one value per epoch
    WarmRestart,
    /// Cyclic learning rate, one value per training batch
    Cyclic,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ScheduleArgs {
    #[arg(value_enum)]
    pub policy: SchedulePolicy,

    /// Number of epochs (warm restart) or batches (cyclic) to print
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Warm restart: lower bound
    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    /// Upper bound for both policies
    #[arg(long)]
    pub max_lr: Option<f64>,

    /// Warm restart: epochs in the first period
    #[arg(long, default_value_t = 10.0)]
    pub base_period: f64,

    /// Warm restart: period growth after each restart
    #[arg(long, default_value_t = 2.0)]
    pub period_mult: f64,

    /// Cyclic: lower bound
    #[arg(long, default_value_t = 1e-3)]
    pub base_lr: f64,

    /// Cyclic: batches per half cycle
    #[arg(long, default_value_t = 2000.0)]
    pub step_size: f64,

    /// Cyclic: triangular, triangular2 or exp_range
    #[arg(long, default_value = "triangular")]
    pub mode: String,

    /// Cyclic: decay for exp_range
    #[arg(long, default_value_t = 1.0)]
    pub gamma: f64,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct HistoryArgs {
    /// History JSON file written by `fit`
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Query such as `-1,train_loss` or `:,batches,-1,valid_loss`
    #[arg(value_name = "PATH", allow_hyphen_values = true)]
    pub path: Option<String>,
}

/// Parse arguments from an iterator
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply `fit` flag overrides onto a spec's params
pub fn apply_overrides(spec: &mut RunSpec, args: &FitArgs) {
    if let Some(epochs) = args.epochs {
        spec.params.insert("max_epochs", epochs);
    }
    if let Some(lr) = args.lr {
        spec.params.insert("lr", lr);
    }
    if let Some(batch_size) = args.batch_size {
        spec.params.insert("batch_size", batch_size);
    }
    if let Some(seed) = args.seed {
        spec.params.insert("seed", seed as usize);
    }
}
