//! Loss criteria
//!
//! A [`Criterion`] returns the batch loss together with its gradient with
//! respect to the module output, which the net feeds to
//! [`Module::backward`](crate::module::Module::backward).

mod losses;

pub use losses::{CrossEntropyLoss, MSELoss, NLLLoss, Reduction};

use crate::dataset::Target;
use crate::params::Params;
use crate::{Error, Result};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

/// Loss function with an analytic gradient
pub trait Criterion: CriterionClone + Send {
    /// `(loss, dLoss/dOutput)` for one batch
    fn forward(&self, output: &Array2<f32>, target: &Target) -> Result<(f32, Array2<f32>)>;

    fn name(&self) -> &str;
}

pub trait CriterionClone {
    fn clone_box(&self) -> Box<dyn Criterion>;
}

impl<T: Criterion + Clone + 'static> CriterionClone for T {
    fn clone_box(&self) -> Box<dyn Criterion> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Criterion> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Builds a criterion from routed `criterion__*` parameters
pub trait CriterionFactory: Send + Sync {
    fn build(&self, kwargs: &Params) -> Result<Box<dyn Criterion>>;

    fn name(&self) -> String;
}

/// Built-in criteria selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    Nll,
    CrossEntropy,
    Mse,
}

impl FromStr for CriterionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "").as_str() {
            "nll" | "nllloss" => Ok(CriterionKind::Nll),
            "crossentropy" | "crossentropyloss" => Ok(CriterionKind::CrossEntropy),
            "mse" | "mseloss" => Ok(CriterionKind::Mse),
            _ => Err(Error::InvalidValue {
                key: "criterion".into(),
                reason: format!("unknown criterion '{s}'"),
            }),
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionKind::Nll => f.write_str("NLLLoss"),
            CriterionKind::CrossEntropy => f.write_str("CrossEntropyLoss"),
            CriterionKind::Mse => f.write_str("MSELoss"),
        }
    }
}

impl CriterionFactory for CriterionKind {
    fn build(&self, kwargs: &Params) -> Result<Box<dyn Criterion>> {
        kwargs.ensure_only(&["reduction"])?;
        let reduction: Reduction = kwargs.str_or("reduction", "mean")?.parse()?;
        Ok(match self {
            CriterionKind::Nll => Box::new(NLLLoss { reduction }),
            CriterionKind::CrossEntropy => Box::new(CrossEntropyLoss { reduction }),
            CriterionKind::Mse => Box::new(MSELoss { reduction }),
        })
    }

    fn name(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("nll".parse::<CriterionKind>().unwrap(), CriterionKind::Nll);
        assert_eq!("CrossEntropyLoss".parse::<CriterionKind>().unwrap(), CriterionKind::CrossEntropy);
        assert_eq!("mse_loss".parse::<CriterionKind>().unwrap(), CriterionKind::Mse);
        assert!("hinge".parse::<CriterionKind>().is_err());
    }

    #[test]
    fn test_factory_reduction_kwarg() {
        let out = array![[0.5f32, 0.5], [0.25, 0.75]];
        let y = Target::from(vec![0, 1]);
        let mean = CriterionKind::Nll.build(&Params::new()).unwrap();
        let sum = CriterionKind::Nll.build(&Params::new().with("reduction", "sum")).unwrap();
        let (lm, _) = mean.forward(&out, &y).unwrap();
        let (ls, _) = sum.forward(&out, &y).unwrap();
        assert_abs_diff_eq!(ls, 2.0 * lm, epsilon = 1e-6);
        assert!(CriterionKind::Nll.build(&Params::new().with("weight", 1.0)).is_err());
    }
}
