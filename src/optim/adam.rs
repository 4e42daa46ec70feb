//! Adam optimizer

use super::groups::ParamGroup;
use super::optimizer::{check_param_count, Optimizer};
use crate::module::Parameter;
use crate::Result;
use ndarray::{ArrayD, Zip};

/// Adam with bias-corrected moments and optional L2 weight decay
#[derive(Debug, Clone)]
pub struct Adam {
    groups: Vec<ParamGroup>,
    beta1: f64,
    beta2: f64,
    eps: f64,
    weight_decay: f64,
    t: u64,
    m: Vec<Option<ArrayD<f32>>>, // First moment
    v: Vec<Option<ArrayD<f32>>>, // Second moment
}

impl Adam {
    pub fn new(groups: Vec<ParamGroup>, n_params: usize, beta1: f64, beta2: f64, eps: f64, weight_decay: f64) -> Self {
        Self {
            groups,
            beta1,
            beta2,
            eps,
            weight_decay,
            t: 0,
            m: vec![None; n_params],
            v: vec![None; n_params],
        }
    }

    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, mut params: Vec<(String, &mut Parameter)>) -> Result<()> {
        check_param_count(self.m.len(), &params)?;
        self.t += 1;
        let t = self.t as i32;
        for group in &self.groups {
            let beta1 = group.option_f64("beta1", self.beta1)?;
            let beta2 = group.option_f64("beta2", self.beta2)?;
            let eps = group.option_f64("eps", self.eps)? as f32;
            let weight_decay = group.option_f64("weight_decay", self.weight_decay)? as f32;
            // Bias correction folded into the step size
            let lr_t = (group.lr * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t))) as f32;
            let (b1, b2) = (beta1 as f32, beta2 as f32);

            for &i in &group.members {
                let param = &mut *params[i].1;
                let mut grad = param.grad.clone();
                if weight_decay != 0.0 {
                    grad.scaled_add(weight_decay, &param.data);
                }
                let m = self.m[i].get_or_insert_with(|| ArrayD::zeros(grad.raw_dim()));
                let v = self.v[i].get_or_insert_with(|| ArrayD::zeros(grad.raw_dim()));
                Zip::from(&mut param.data).and(m).and(v).and(&grad).for_each(|p, m, v, &g| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *p -= lr_t * *m / (v.sqrt() + eps);
                });
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
        "Adam"
    }
}
