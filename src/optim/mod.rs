//! Optimizers for training neural networks
//!
//! Optimizers are built by an [`OptimizerFactory`] from the module's
//! parameter names, the estimator's `lr` and the routed `optimizer__*`
//! parameters. `optimizer__param_groups` splits parameters into groups by glob
//! pattern:
//!
//! ```
//! use skorch::optim::{OptimizerFactory, OptimizerKind};
//! use skorch::params::{ParamValue, Params};
//! use std::collections::BTreeMap;
//!
//! let names: Vec<String> = ["dense0.weight", "dense1.weight", "output.weight"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let fast = BTreeMap::from([("lr".to_string(), ParamValue::Float(0.5))]);
//! let groups = ParamValue::List(vec![ParamValue::List(vec!["dense*".into(), ParamValue::Map(fast)])]);
//! let opt = OptimizerKind::Sgd
//!     .build(&names, &Params::new().with("param_groups", groups), 0.01)
//!     .unwrap();
//! assert_eq!(opt.param_groups().len(), 2);
//! assert_eq!(opt.param_groups()[0].lr, 0.5);
//! assert_eq!(opt.param_groups()[1].lr, 0.01);
//! ```

mod adam;
mod groups;
mod optimizer;
mod sgd;


pub use adam::Adam;
pub use groups::{build_param_groups, glob_to_regex, parse_group_specs, ParamGroup};
pub use optimizer::{Optimizer, OptimizerClone};
pub use sgd::SGD;

use crate::params::Params;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Builds an optimizer for a module's named parameters
pub trait OptimizerFactory: Send + Sync {
    fn build(&self, names: &[String], kwargs: &Params, lr: f64) -> Result<Box<dyn Optimizer>>;

    fn name(&self) -> String;
}

/// Built-in optimizers selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl OptimizerKind {
    fn allowed_keys(self) -> &'static [&'static str] {
        match self {
            OptimizerKind::Sgd => &["lr", "param_groups", "momentum", "weight_decay"],
            OptimizerKind::Adam => &["lr", "param_groups", "betas", "beta1", "beta2", "eps", "weight_decay"],
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "adam" => Ok(OptimizerKind::Adam),
            _ => Err(Error::InvalidValue {
                key: "optimizer".into(),
                reason: format!("unknown optimizer '{s}'"),
            }),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Sgd => f.write_str("SGD"),
            OptimizerKind::Adam => f.write_str("Adam"),
        }
    }
}

impl OptimizerFactory for OptimizerKind {
    fn build(&self, names: &[String], kwargs: &Params, lr: f64) -> Result<Box<dyn Optimizer>> {
        kwargs.ensure_only(self.allowed_keys())?;
        let lr = kwargs.f64_or("lr", lr)?;
        let specs = match kwargs.get("param_groups") {
            Some(value) => parse_group_specs(value)?,
            None => Vec::new(),
        };
        let groups = build_param_groups(names, &specs, lr)?;
        let weight_decay = kwargs.f64_or("weight_decay", 0.0)?;
        Ok(match self {
            OptimizerKind::Sgd => {
                Box::new(SGD::new(groups, names.len(), kwargs.f64_or("momentum", 0.0)?, weight_decay))
            }
            OptimizerKind::Adam => {
                let (mut beta1, mut beta2) = (0.9, 0.999);
                if let Some(betas) = kwargs.get("betas") {
                    match betas.as_list().map(|l| l.iter().map(|b| b.as_f64()).collect::<Vec<_>>()) {
                        Some(v) if v.len() == 2 && v.iter().all(Option::is_some) => {
                            beta1 = v[0].unwrap_or(beta1);
                            beta2 = v[1].unwrap_or(beta2);
                        }
                        _ => {
                            return Err(Error::InvalidValue {
                                key: "betas".into(),
                                reason: format!("expected two numbers, got {betas}"),
                            })
                        }
                    }
                }
                Box::new(Adam::new(
                    groups,
                    names.len(),
                    kwargs.f64_or("beta1", beta1)?,
                    kwargs.f64_or("beta2", beta2)?,
                    kwargs.f64_or("eps", 1e-8)?,
                    weight_decay,
                ))
            }
        })
    }

    fn name(&self) -> String {
        self.to_string()
    }
}
