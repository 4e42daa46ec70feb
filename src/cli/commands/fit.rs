//! Fit command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_data, load_spec, validate_spec, FitArgs};
use crate::net::NeuralNet;
use crate::params::Params;
use crate::{Error, Result};
use std::path::Path;
use tracing::info;

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(std::fs::create_dir_all(dir)?),
        _ => Ok(()),
    }
}

/// Load the spec, apply overrides and fit; outputs named in the spec are
/// written. With `dry_run` the net is only initialized.
pub fn fit_from_spec(args: &FitArgs, level: LogLevel) -> Result<NeuralNet> {
    let mut spec = load_spec(&args.spec)?;
    apply_overrides(&mut spec, args);
    validate_spec(&spec).map_err(|e| Error::Config(format!("Invalid spec after overrides: {e}")))?;

    let mut net = spec.build_net()?;
    if level == LogLevel::Quiet {
        net.set_params(&Params::new().with("verbose", 0))?;
    }
    if args.dry_run {
        net.initialize()?;
        return Ok(net);
    }

    let (x, y) = load_data(&spec.data, spec.kind)?;
    let y = y.ok_or_else(|| Error::Config(format!("data file {} has no y", spec.data.display())))?;
    info!(samples = x.nrows(), features = x.ncols(), net = net.kind().name(), "fitting");
    net.fit(&x, Some(&y))?;
    info!(epochs = net.history().len(), "fit finished");

    if let Some(path) = &spec.output.params {
        ensure_parent(path)?;
        net.save_params(path)?;
        info!(path = %path.display(), "saved params");
    }
    if let Some(path) = &spec.output.history {
        ensure_parent(path)?;
        net.save_history(path)?;
        info!(path = %path.display(), "saved history");
    }
    Ok(net)
}

pub fn run_fit(args: &FitArgs, level: LogLevel) -> Result<()> {
    log(level, LogLevel::Normal, &format!("skorch: fitting from {}", args.spec.display()));
    let net = fit_from_spec(args, level)?;
    if args.dry_run {
        log(level, LogLevel::Normal, "Dry run - spec validated and net initialized");
        log(level, LogLevel::Verbose, &net.to_string());
        return Ok(());
    }
    if let Some(loss) = net.history().last_f64("train_loss") {
        log(level, LogLevel::Normal, &format!("Final train_loss: {loss:.4}"));
    }
    if let Some(loss) = net.history().last_f64("valid_loss") {
        log(level, LogLevel::Normal, &format!("Final valid_loss: {loss:.4}"));
    }
    log(level, LogLevel::Normal, "Fit complete!");
    Ok(())
}
