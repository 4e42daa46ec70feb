//! Optimizer trait

use super::groups::ParamGroup;
use crate::module::Parameter;
use crate::{Error, Result};

/// Trait for optimization algorithms
///
/// Parameters arrive in the module's stable order; each group lists the
/// indices it owns.
pub trait Optimizer: OptimizerClone + Send {
    /// Apply one update from the accumulated gradients
    fn step(&mut self, params: Vec<(String, &mut Parameter)>) -> Result<()>;

    fn param_groups(&self) -> &[ParamGroup];

    fn param_groups_mut(&mut self) -> &mut [ParamGroup];

    fn name(&self) -> &str;

    /// Learning rate of the first group
    fn lr(&self) -> f64 {
        self.param_groups().first().map_or(0.0, |g| g.lr)
    }

    /// Set the learning rate of every group
    fn set_lr(&mut self, lr: f64) {
        for group in self.param_groups_mut() {
            group.lr = lr;
        }
    }

    /// One learning rate per group
    fn set_group_lrs(&mut self, lrs: &[f64]) -> Result<()> {
        let groups = self.param_groups_mut();
        if lrs.len() != groups.len() {
            return Err(Error::LengthMismatch {
                name: "lr".into(),
                expected: groups.len(),
                got: lrs.len(),
            });
        }
        for (group, &lr) in groups.iter_mut().zip(lrs) {
            group.lr = lr;
        }
        Ok(())
    }
}

pub trait OptimizerClone {
    fn clone_box(&self) -> Box<dyn Optimizer>;
}

impl<T: Optimizer + Clone + 'static> OptimizerClone for T {
    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Optimizer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Checks the parameter list against the size the optimizer was built for
pub(crate) fn check_param_count(expected: usize, params: &[(String, &mut Parameter)]) -> Result<()> {
    if params.len() != expected {
        return Err(Error::ShapeMismatch(format!(
            "optimizer was built for {expected} parameters, got {}",
            params.len()
        )));
    }
    Ok(())
}
