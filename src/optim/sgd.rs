//! Stochastic Gradient Descent optimizer

use super::groups::ParamGroup;
use super::optimizer::{check_param_count, Optimizer};
use crate::module::Parameter;
use crate::Result;
use ndarray::ArrayD;

/// SGD optimizer with optional momentum and L2 weight decay
///
/// `v = momentum * v + g; p -= lr * v`, with `g += weight_decay * p` first.
#[derive(Debug, Clone)]
pub struct SGD {
    groups: Vec<ParamGroup>,
    momentum: f64,
    weight_decay: f64,
    velocities: Vec<Option<ArrayD<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer over `n_params` parameters
    pub fn new(groups: Vec<ParamGroup>, n_params: usize, momentum: f64, weight_decay: f64) -> Self {
        Self { groups, momentum, weight_decay, velocities: vec![None; n_params] }
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl Optimizer for SGD {
    fn step(&mut self, mut params: Vec<(String, &mut Parameter)>) -> Result<()> {
        check_param_count(self.velocities.len(), &params)?;
        for group in &self.groups {
            let lr = group.lr as f32;
            let momentum = group.option_f64("momentum", self.momentum)? as f32;
            let weight_decay = group.option_f64("weight_decay", self.weight_decay)? as f32;
            for &i in &group.members {
                let param = &mut *params[i].1;
                let mut grad = param.grad.clone();
                if weight_decay != 0.0 {
                    grad.scaled_add(weight_decay, &param.data);
                }
                if momentum > 0.0 {
                    let velocity = match self.velocities[i].take() {
                        Some(v) => v * momentum + &grad,
                        None => grad,
                    };
                    param.data.scaled_add(-lr, &velocity);
                    self.velocities[i] = Some(velocity);
                } else {
                    param.data.scaled_add(-lr, &grad);
                }
            }
        }
        Ok(())
    }

    fn param_groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.groups
    }

    fn name(&self) -> &str {
        "SGD"
    }
}
