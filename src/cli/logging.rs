//! Log levels and tracing setup for the binary

use tracing_subscriber::EnvFilter;

/// Verbosity chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Warnings and errors only
    Quiet,
    #[default]
    Normal,
    /// Debug diagnostics
    Verbose,
}

impl LogLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            LogLevel::Quiet
        } else if verbose {
            LogLevel::Verbose
        } else {
            LogLevel::Normal
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Quiet => "skorch=warn",
            LogLevel::Normal => "skorch=info",
            LogLevel::Verbose => "skorch=debug",
        }
    }
}

/// Install a stderr `fmt` subscriber; `RUST_LOG` wins over `level`
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    // a subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Print `msg` to stdout if `level` permits it
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}
