//! Transformer steps followed by a final estimator

use super::estimator::Estimator;
use crate::dataset::Target;
use crate::params::{split_key, Params};
use crate::{Error, Result};
use ndarray::Array2;
use std::collections::HashSet;
use tracing::debug;

/// A fitted feature transformation
pub trait Transformer: Send {
    fn fit(&mut self, x: &Array2<f32>) -> Result<()>;

    fn transform(&self, x: &Array2<f32>) -> Result<Array2<f32>>;

    fn fit_transform(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn get_params(&self) -> Params {
        Params::new()
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        match params.keys().next() {
            None => Ok(()),
            Some(key) => Err(Error::InvalidParameter {
                key: key.to_string(),
                estimator: self.type_name().to_string(),
            }),
        }
    }

    fn clone_unfitted(&self) -> Box<dyn Transformer>;

    fn type_name(&self) -> &str;
}

/// Named transformer steps and a named final estimator
///
/// Parameters are addressed as `<step>__<key>`, e.g. `net__lr` or
/// `net__module__num_units`, so a pipeline can itself be grid-searched.
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Transformer>)>,
    final_name: String,
    estimator: Box<dyn Estimator>,
}

impl Pipeline {
    pub fn new(
        steps: Vec<(String, Box<dyn Transformer>)>,
        final_name: impl Into<String>,
        estimator: Box<dyn Estimator>,
    ) -> Result<Self> {
        let final_name = final_name.into();
        let mut seen = HashSet::new();
        for name in steps.iter().map(|(n, _)| n.as_str()).chain(std::iter::once(final_name.as_str())) {
            if name.is_empty() || name.contains("__") {
                return Err(Error::InvalidValue {
                    key: "steps".into(),
                    reason: format!("step name '{name}' must be non-empty and must not contain '__'"),
                });
            }
            if !seen.insert(name) {
                return Err(Error::InvalidValue {
                    key: "steps".into(),
                    reason: format!("step name '{name}' appears more than once"),
                });
            }
        }
        Ok(Self { steps, final_name, estimator })
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(std::iter::once(self.final_name.as_str()))
            .collect()
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    pub fn estimator_mut(&mut self) -> &mut dyn Estimator {
        self.estimator.as_mut()
    }

    fn transform_all(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let mut out = x.clone();
        for (_, step) in &self.steps {
            out = step.transform(&out)?;
        }
        Ok(out)
    }
}

impl Estimator for Pipeline {
    fn fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<()> {
        let mut out = x.clone();
        for (name, step) in &mut self.steps {
            debug!(step = %name, "fitting pipeline step");
            out = step.fit_transform(&out)?;
        }
        self.estimator.fit(&out, y)
    }

    fn predict(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let out = self.transform_all(x)?;
        self.estimator.predict(&out)
    }

    fn score(&mut self, x: &Array2<f32>, y: &Target) -> Result<f64> {
        let out = self.transform_all(x)?;
        self.estimator.score(&out, y)
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        for (name, step) in &self.steps {
            for (k, v) in step.get_params().iter() {
                params.insert(format!("{name}__{k}"), v.clone());
            }
        }
        for (k, v) in self.estimator.get_params().iter() {
            params.insert(format!("{}__{k}", self.final_name), v.clone());
        }
        params
    }

    /// Route `<step>__<key>` values to their step; unknown steps are
    /// rejected before any step changes
    fn set_params(&mut self, params: &Params) -> Result<()> {
        let mut by_step: Vec<(String, Params)> = Vec::new();
        for (key, value) in params.iter() {
            let (step, rest) = split_key(key);
            let known = self.step_names().contains(&step);
            let Some(rest) = rest.filter(|_| known) else {
                return Err(Error::InvalidParameter { key: key.to_string(), estimator: "Pipeline".into() });
            };
            match by_step.iter_mut().find(|(name, _)| name == step) {
                Some((_, sub)) => {
                    sub.insert(rest, value.clone());
                }
                None => by_step.push((step.to_string(), Params::new().with(rest, value.clone()))),
            }
        }
        for (step, sub) in by_step {
            if step == self.final_name {
                self.estimator.set_params(&sub)?;
            } else if let Some((_, transformer)) = self.steps.iter_mut().find(|(name, _)| *name == step) {
                transformer.set_params(&sub)?;
            }
        }
        Ok(())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            steps: self.steps.iter().map(|(n, s)| (n.clone(), s.clone_unfitted())).collect(),
            final_name: self.final_name.clone(),
            estimator: self.estimator.clone_unfitted(),
        })
    }
}
