//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_spec, RunSpec, ValidateArgs};
use crate::Result;

/// Human-readable summary of a spec
pub fn format_spec(spec: &RunSpec) -> String {
    let mut lines = vec![format!("  Kind: {}", spec.kind.name()), format!("  Module: {}", spec.module)];
    if !spec.params.is_empty() {
        lines.push(format!("  Params: {}", spec.params));
    }
    for cb in &spec.callbacks {
        lines.push(format!("  Callback {}: {} {}", cb.name, cb.type_name, cb.params));
    }
    lines.push(format!("  Data: {}", spec.data.display()));
    if let Some(p) = &spec.output.params {
        lines.push(format!("  Params output: {}", p.display()));
    }
    if let Some(p) = &spec.output.history {
        lines.push(format!("  History output: {}", p.display()));
    }
    lines.join("\n")
}

pub fn run_validate(args: &ValidateArgs, level: LogLevel) -> Result<()> {
    let spec = load_spec(&args.spec)?;
    // building catches module settings and component names the schema cannot
    spec.build_net()?;
    log(level, LogLevel::Normal, &format!("{} is valid", args.spec.display()));
    log(level, LogLevel::Verbose, &format_spec(&spec));
    Ok(())
}
