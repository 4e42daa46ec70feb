//! Named trainable tensors and module state

use crate::{Error, Result};
use ndarray::{ArrayD, IxDyn};

/// A trainable tensor with its accumulated gradient
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub data: ArrayD<f32>,
    pub grad: ArrayD<f32>,
}

impl Parameter {
    pub fn new(data: ArrayD<f32>) -> Self {
        let grad = ArrayD::zeros(data.raw_dim());
        Self { data, grad }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }
}

/// Ordered snapshot of parameter values keyed by dotted name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDict {
    entries: Vec<(String, ArrayD<f32>)>,
}

impl StateDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArrayD<f32>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Copy values into `params`, requiring identical names and shapes
    pub fn copy_into(&self, params: Vec<(String, &mut Parameter)>) -> Result<()> {
        if params.len() != self.entries.len() {
            return Err(Error::ShapeMismatch(format!(
                "state has {} tensors, module has {}",
                self.entries.len(),
                params.len()
            )));
        }
        for (name, param) in params {
            let value = self.get(&name).ok_or_else(|| {
                Error::ShapeMismatch(format!("missing tensor '{name}' in state"))
            })?;
            if value.shape() != param.shape() {
                return Err(Error::ShapeMismatch(format!(
                    "tensor '{name}' has shape {:?}, module expects {:?}",
                    value.shape(),
                    param.shape()
                )));
            }
            param.data.assign(value);
        }
        Ok(())
    }
}

impl FromIterator<(String, ArrayD<f32>)> for StateDict {
    fn from_iter<I: IntoIterator<Item = (String, ArrayD<f32>)>>(iter: I) -> Self {
        let mut state = StateDict::new();
        for (name, value) in iter {
            state.insert(name, value);
        }
        state
    }
}
