//! Inference: `forward`, `predict_proba`, `predict`, `score`

use super::core::{not_initialized, NetKind, NeuralNet};
use crate::callbacks::{accuracy, argmax_rows, r2_score};
use crate::dataset::{DataLoader, Dataset, LoaderConfig, Target};
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

impl NeuralNet {
    /// Module output for `x` in evaluation mode, computed in
    /// `iterator_valid` batches and concatenated
    pub fn forward(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let kind = self.kind;
        if self.module.is_none() {
            return Err(not_initialized(kind));
        }
        let config =
            LoaderConfig::from_params(self.config.batch_size, false, &self.params.prefixed("iterator_valid"))?;
        let dataset = Dataset::new(x.clone(), None)?;
        let loader = DataLoader::new(&dataset, config, &mut self.rng);
        let module = self.module.as_mut().ok_or_else(|| not_initialized(kind))?;
        let mut outputs = Vec::with_capacity(loader.num_batches());
        for batch in loader {
            outputs.push(module.forward(&batch.x, false)?);
        }
        let views: Vec<_> = outputs.iter().map(Array2::view).collect();
        if views.is_empty() {
            return Ok(Array2::zeros((0, 0)));
        }
        ndarray::concatenate(Axis(0), &views).map_err(|e| Error::ShapeMismatch(e.to_string()))
    }

    /// Class probabilities
    ///
    /// Module outputs are returned as they are, except that logits trained
    /// with `CrossEntropyLoss` are passed through a softmax.
    pub fn predict_proba(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let output = self.forward(x)?;
        let logits = self.criterion.as_ref().is_some_and(|c| c.name() == "CrossEntropyLoss");
        Ok(if logits { softmax_rows(output) } else { output })
    }

    /// Raw module outputs (regression and the base net)
    pub fn predict(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.forward(x)
    }

    /// Most probable class per row
    pub fn predict_classes(&mut self, x: &Array2<f32>) -> Result<Array1<usize>> {
        Ok(Array1::from(argmax_rows(&self.predict_proba(x)?)))
    }

    /// Accuracy for classifiers, R² otherwise
    pub fn score(&mut self, x: &Array2<f32>, y: &Target) -> Result<f64> {
        match self.kind {
            NetKind::Classifier => accuracy(&self.predict_proba(x)?, y),
            NetKind::Base | NetKind::Regressor => r2_score(&self.forward(x)?, y),
        }
    }
}

fn softmax_rows(mut z: Array2<f32>) -> Array2<f32> {
    for mut row in z.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    z
}
