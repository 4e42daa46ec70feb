use super::Criterion;
use crate::dataset::Target;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use std::str::FromStr;

const PROB_FLOOR: f32 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
}

impl Reduction {
    fn divisor(self, n: usize) -> f32 {
        match self {
            Reduction::Mean => n.max(1) as f32,
            Reduction::Sum => 1.0,
        }
    }
}

impl FromStr for Reduction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(Reduction::Mean),
            "sum" => Ok(Reduction::Sum),
            other => Err(Error::InvalidValue {
                key: "reduction".into(),
                reason: format!("expected 'mean' or 'sum', got '{other}'"),
            }),
        }
    }
}

fn class_targets<'a>(target: &'a Target, output: &Array2<f32>) -> Result<&'a Array1<usize>> {
    let labels = target
        .classes()
        .ok_or_else(|| Error::ShapeMismatch("expected class labels as target".into()))?;
    if labels.len() != output.nrows() {
        return Err(Error::ShapeMismatch(format!(
            "output has {} rows, target has {}",
            output.nrows(),
            labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&c| c >= output.ncols()) {
        return Err(Error::ShapeMismatch(format!(
            "label {bad} out of range for {} classes",
            output.ncols()
        )));
    }
    Ok(labels)
}

/// Negative log-likelihood of class probabilities
///
/// The module is expected to emit probabilities (softmax output); the loss
/// takes their log, clamped away from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NLLLoss {
    pub reduction: Reduction,
}

impl Criterion for NLLLoss {
    fn forward(&self, output: &Array2<f32>, target: &Target) -> Result<(f32, Array2<f32>)> {
        let labels = class_targets(target, output)?;
        let div = self.reduction.divisor(labels.len());
        let mut grad = Array2::zeros(output.raw_dim());
        let mut loss = 0.0;
        for (i, &c) in labels.iter().enumerate() {
            let p = output[[i, c]].max(PROB_FLOOR);
            loss -= p.ln();
            grad[[i, c]] = -1.0 / (p * div);
        }
        Ok((loss / div, grad))
    }

    fn name(&self) -> &str {
        "NLLLoss"
    }
}

/// Softmax cross-entropy on raw logits
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss {
    pub reduction: Reduction,
}

impl Criterion for CrossEntropyLoss {
    fn forward(&self, output: &Array2<f32>, target: &Target) -> Result<(f32, Array2<f32>)> {
        let labels = class_targets(target, output)?;
        let div = self.reduction.divisor(labels.len());
        let mut grad = output.clone();
        let mut loss = 0.0;
        for (mut row, &c) in grad.axis_iter_mut(Axis(0)).zip(labels.iter()) {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
            loss -= row[c].max(PROB_FLOOR).ln();
            row[c] -= 1.0;
            row.mapv_inplace(|v| v / div);
        }
        Ok((loss / div, grad))
    }

    fn name(&self) -> &str {
        "CrossEntropyLoss"
    }
}

/// Squared error averaged over every element
#[derive(Debug, Clone, Copy, Default)]
pub struct MSELoss {
    pub reduction: Reduction,
}

impl Criterion for MSELoss {
    fn forward(&self, output: &Array2<f32>, target: &Target) -> Result<(f32, Array2<f32>)> {
        let values = target
            .values()
            .ok_or_else(|| Error::ShapeMismatch("MSELoss expects real-valued targets".into()))?;
        if values.dim() != output.dim() {
            return Err(Error::ShapeMismatch(format!(
                "output shape {:?} does not match target {:?}",
                output.dim(),
                values.dim()
            )));
        }
        let div = self.reduction.divisor(output.len());
        let diff = output - values;
        let loss = diff.mapv(|d| d * d).sum() / div;
        Ok((loss, diff * (2.0 / div)))
    }

    fn name(&self) -> &str {
        "MSELoss"
    }
}
