//! Schedule command: learning rates of a scheduler over a number of steps

use crate::config::{SchedulePolicy, ScheduleArgs};
use crate::lr_scheduler::{CyclicConfig, CyclicLR, LrSpec, WarmRestartConfig, WarmRestartLR};
use crate::Result;

/// One learning rate per step for a single parameter group
pub fn schedule_values(args: &ScheduleArgs) -> Result<Vec<f64>> {
    let steps = 0..args.steps as i64;
    Ok(match args.policy {
        SchedulePolicy::WarmRestart => {
            let config = WarmRestartConfig {
                min_lr: LrSpec::Scalar(args.min_lr),
                max_lr: LrSpec::Scalar(args.max_lr.unwrap_or(0.05)),
                base_period: args.base_period,
                period_mult: args.period_mult,
                last_epoch: -1,
            };
            let scheduler = WarmRestartLR::for_groups(1, config)?;
            steps.map(|i| scheduler.lr_at(i).first().copied().unwrap_or_default()).collect()
        }
        SchedulePolicy::Cyclic => {
            let config = CyclicConfig {
                base_lr: LrSpec::Scalar(args.base_lr),
                max_lr: LrSpec::Scalar(args.max_lr.unwrap_or(6e-3)),
                step_size: args.step_size,
                mode: args.mode.clone(),
                gamma: args.gamma,
                ..CyclicConfig::default()
            };
            let scheduler = CyclicLR::for_groups(1, config)?;
            steps.map(|i| scheduler.lr_at(i).first().copied().unwrap_or_default()).collect()
        }
    })
}

pub fn format_schedule(values: &[f64], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(values)?);
    }
    let mut lines = vec![format!("{:>6}  {}", "step", "lr")];
    lines.extend(values.iter().enumerate().map(|(i, lr)| format!("{i:>6}  {lr:.8}")));
    Ok(lines.join("\n"))
}

pub fn run_schedule(args: &ScheduleArgs) -> Result<()> {
    let values = schedule_values(args)?;
    println!("{}", format_schedule(&values, args.json)?);
    Ok(())
}
