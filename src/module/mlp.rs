//! Multi-layer perceptron with hand-written backpropagation

use super::parameter::Parameter;
use super::traits::{Module, ModuleFactory};
use crate::params::Params;
use crate::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, Ix1, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

/// Hidden-layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nonlinearity {
    Relu,
    Tanh,
    Sigmoid,
}

impl Nonlinearity {
    fn apply(self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Nonlinearity::Relu => z.mapv(|v| v.max(0.0)),
            Nonlinearity::Tanh => z.mapv(f32::tanh),
            Nonlinearity::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
        }
    }

    /// Derivative expressed through pre-activation `z` and activation `a`
    fn derivative(self, z: &Array2<f32>, a: &Array2<f32>) -> Array2<f32> {
        match self {
            Nonlinearity::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Nonlinearity::Tanh => a.mapv(|v| 1.0 - v * v),
            Nonlinearity::Sigmoid => a.mapv(|v| v * (1.0 - v)),
        }
    }
}

impl FromStr for Nonlinearity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "relu" => Ok(Nonlinearity::Relu),
            "tanh" => Ok(Nonlinearity::Tanh),
            "sigmoid" => Ok(Nonlinearity::Sigmoid),
            other => Err(Error::InvalidValue {
                key: "nonlin".into(),
                reason: format!("unknown nonlinearity '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Nonlinearity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nonlinearity::Relu => "relu",
            Nonlinearity::Tanh => "tanh",
            Nonlinearity::Sigmoid => "sigmoid",
        };
        f.write_str(name)
    }
}

/// Final-layer transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    /// Row-wise softmax, for classifiers paired with NLL loss
    Softmax,
    /// Raw linear output, for regressors or logit losses
    Identity,
}

impl FromStr for OutputActivation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "softmax" => Ok(OutputActivation::Softmax),
            "identity" | "linear" | "none" => Ok(OutputActivation::Identity),
            other => Err(Error::InvalidValue {
                key: "output".into(),
                reason: format!("unknown output activation '{other}'"),
            }),
        }
    }
}

impl fmt::Display for OutputActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputActivation::Softmax => f.write_str("softmax"),
            OutputActivation::Identity => f.write_str("identity"),
        }
    }
}

/// Architecture of an [`Mlp`]
#[derive(Debug, Clone, PartialEq)]
pub struct MlpConfig {
    pub in_features: usize,
    pub out_features: usize,
    pub num_units: usize,
    pub num_hidden: usize,
    pub nonlin: Nonlinearity,
    pub dropout: f32,
    pub output: OutputActivation,
}

impl MlpConfig {
    pub const KEYS: [&'static str; 7] = [
        "in_features",
        "out_features",
        "num_units",
        "num_hidden",
        "nonlin",
        "dropout",
        "output",
    ];

    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            in_features,
            out_features,
            num_units: 10,
            num_hidden: 2,
            nonlin: Nonlinearity::Relu,
            dropout: 0.0,
            output: OutputActivation::Softmax,
        }
    }

    /// Copy of this config with `kwargs` applied on top
    pub fn with_kwargs(&self, kwargs: &Params) -> Result<Self> {
        kwargs.ensure_only(&Self::KEYS)?;
        let dropout = kwargs.f64_or("dropout", f64::from(self.dropout))?;
        if !(0.0..1.0).contains(&dropout) {
            return Err(Error::InvalidValue {
                key: "dropout".into(),
                reason: format!("must be in [0, 1), got {dropout}"),
            });
        }
        let nonlin = match kwargs.get("nonlin") {
            Some(v) => v.as_str().unwrap_or_default().parse()?,
            None => self.nonlin,
        };
        let output = match kwargs.get("output") {
            Some(v) => v.as_str().unwrap_or_default().parse()?,
            None => self.output,
        };
        Ok(Self {
            in_features: kwargs.usize_or("in_features", self.in_features)?,
            out_features: kwargs.usize_or("out_features", self.out_features)?,
            num_units: kwargs.usize_or("num_units", self.num_units)?,
            num_hidden: kwargs.usize_or("num_hidden", self.num_hidden)?,
            nonlin,
            dropout: dropout as f32,
            output,
        })
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .with("in_features", self.in_features)
            .with("out_features", self.out_features)
            .with("num_units", self.num_units)
            .with("num_hidden", self.num_hidden)
            .with("nonlin", self.nonlin.to_string())
            .with("dropout", self.dropout)
            .with("output", self.output.to_string())
    }
}

#[derive(Debug, Clone)]
struct Dense {
    name: String,
    weight: Parameter,
    bias: Parameter,
}

impl Dense {
    /// Uniform(-1/sqrt(fan_in), 1/sqrt(fan_in)) init, weight is `(out, in)`
    fn new(name: String, fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
        let mut draw = || (rng.random::<f32>() * 2.0 - 1.0) * bound;
        let weight = Array2::from_shape_simple_fn((fan_out, fan_in), &mut draw);
        let bias = Array1::from_shape_simple_fn(fan_out, &mut draw);
        Self {
            name,
            weight: Parameter::new(weight.into_dyn()),
            bias: Parameter::new(bias.into_dyn()),
        }
    }

    fn weight(&self) -> Result<ArrayView2<'_, f32>> {
        as_matrix(self.weight.data.view(), &self.name)
    }

    fn bias(&self) -> Result<ArrayView1<'_, f32>> {
        self.bias
            .data
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|e| Error::ShapeMismatch(format!("{}.bias: {e}", self.name)))
    }

    fn forward(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        Ok(x.dot(&self.weight()?.t()) + &self.bias()?)
    }

    /// Accumulate grads for `input -> grad_z`, return dLoss/dInput
    fn backward(&mut self, input: &Array2<f32>, grad_z: &Array2<f32>) -> Result<Array2<f32>> {
        let name = &self.name;
        let mut gw: ArrayViewMut2<'_, f32> = self
            .weight
            .grad
            .view_mut()
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::ShapeMismatch(format!("{name}.weight grad: {e}")))?;
        gw += &grad_z.t().dot(input);
        let mut gb: ArrayViewMut1<'_, f32> = self
            .bias
            .grad
            .view_mut()
            .into_dimensionality::<Ix1>()
            .map_err(|e| Error::ShapeMismatch(format!("{name}.bias grad: {e}")))?;
        gb += &grad_z.sum_axis(Axis(0));
        Ok(grad_z.dot(&self.weight()?))
    }
}

fn as_matrix<'a>(view: ndarray::ArrayViewD<'a, f32>, name: &str) -> Result<ArrayView2<'a, f32>> {
    view.into_dimensionality::<Ix2>()
        .map_err(|e| Error::ShapeMismatch(format!("{name}.weight: {e}")))
}

/// Per-layer activations kept for the backward pass
#[derive(Debug, Clone)]
struct HiddenCache {
    input: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,
    mask: Option<Array2<f32>>,
}

#[derive(Debug, Clone, Default)]
struct ForwardCache {
    hidden: Vec<HiddenCache>,
    output_input: Option<Array2<f32>>,
    output: Option<Array2<f32>>,
}

/// Fully connected network: `dense0..denseN` hidden layers then `output`
#[derive(Debug, Clone)]
pub struct Mlp {
    config: MlpConfig,
    hidden: Vec<Dense>,
    output: Dense,
    rng: StdRng,
    cache: ForwardCache,
}

impl Mlp {
    pub fn new(config: MlpConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut hidden = Vec::with_capacity(config.num_hidden);
        let mut fan_in = config.in_features;
        for i in 0..config.num_hidden {
            hidden.push(Dense::new(format!("dense{i}"), fan_in, config.num_units, &mut rng));
            fan_in = config.num_units;
        }
        let output = Dense::new("output".into(), fan_in, config.out_features, &mut rng);
        Self { config, hidden, output, rng, cache: ForwardCache::default() }
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    fn dropout_mask(&mut self, shape: (usize, usize)) -> Array2<f32> {
        let p = self.config.dropout;
        let keep = 1.0 - p;
        let rng = &mut self.rng;
        Array2::from_shape_simple_fn(shape, || if rng.random::<f32>() < p { 0.0 } else { 1.0 / keep })
    }
}

fn softmax_rows(z: &Array2<f32>) -> Array2<f32> {
    let mut out = z.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

impl Module for Mlp {
    fn forward(&mut self, x: &Array2<f32>, training: bool) -> Result<Array2<f32>> {
        if x.ncols() != self.config.in_features {
            return Err(Error::ShapeMismatch(format!(
                "expected {} input features, got {}",
                self.config.in_features,
                x.ncols()
            )));
        }
        let mut cache = ForwardCache::default();
        let mut h = x.clone();
        for i in 0..self.hidden.len() {
            let z = self.hidden[i].forward(&h)?;
            let mut a = self.config.nonlin.apply(&z);
            let mask = if training && self.config.dropout > 0.0 {
                let mask = self.dropout_mask(a.dim());
                a *= &mask;
                Some(mask)
            } else {
                None
            };
            cache.hidden.push(HiddenCache { input: h, z, a: a.clone(), mask });
            h = a;
        }
        let z = self.output.forward(&h)?;
        let out = match self.config.output {
            OutputActivation::Softmax => softmax_rows(&z),
            OutputActivation::Identity => z,
        };
        cache.output_input = Some(h);
        cache.output = Some(out.clone());
        self.cache = cache;
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Result<()> {
        let cache = std::mem::take(&mut self.cache);
        let (Some(input), Some(out)) = (cache.output_input, cache.output) else {
            return Err(Error::NotInitialized("backward called before forward".into()));
        };
        if grad_output.dim() != out.dim() {
            return Err(Error::ShapeMismatch(format!(
                "gradient shape {:?} does not match output {:?}",
                grad_output.dim(),
                out.dim()
            )));
        }
        let grad_z = match self.config.output {
            OutputActivation::Softmax => {
                let dot = (grad_output * &out).sum_axis(Axis(1)).insert_axis(Axis(1));
                &out * &(grad_output - &dot)
            }
            OutputActivation::Identity => grad_output.clone(),
        };
        let mut grad_h = self.output.backward(&input, &grad_z)?;
        for (layer, layer_cache) in self.hidden.iter_mut().zip(cache.hidden.iter()).rev() {
            if let Some(mask) = &layer_cache.mask {
                grad_h *= mask;
            }
            let pre = grad_h * &self.config.nonlin.derivative(&layer_cache.z, &layer_cache.a);
            grad_h = layer.backward(&layer_cache.input, &pre)?;
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<(String, &Parameter)> {
        let mut out = Vec::with_capacity(2 * (self.hidden.len() + 1));
        for layer in self.hidden.iter().chain(std::iter::once(&self.output)) {
            out.push((format!("{}.weight", layer.name), &layer.weight));
            out.push((format!("{}.bias", layer.name), &layer.bias));
        }
        out
    }

    fn parameters_mut(&mut self) -> Vec<(String, &mut Parameter)> {
        let mut out = Vec::with_capacity(2 * (self.hidden.len() + 1));
        for layer in self.hidden.iter_mut().chain(std::iter::once(&mut self.output)) {
            out.push((format!("{}.weight", layer.name), &mut layer.weight));
            out.push((format!("{}.bias", layer.name), &mut layer.bias));
        }
        out
    }

    fn rebuild(&self, kwargs: &Params, seed: u64) -> Result<Box<dyn Module>> {
        Ok(Box::new(Mlp::new(self.config.with_kwargs(kwargs)?, seed)))
    }

    fn describe(&self) -> String {
        let fields: Vec<String> =
            self.config.to_params().iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("Mlp({})", fields.join(", "))
    }
}

/// Builds [`Mlp`] modules, applying `module__*` overrides to a base config
#[derive(Debug, Clone)]
pub struct MlpFactory {
    pub base: MlpConfig,
}

impl MlpFactory {
    pub fn new(base: MlpConfig) -> Self {
        Self { base }
    }

    /// Softmax output over `n_classes`
    pub fn classifier(in_features: usize, n_classes: usize) -> Self {
        Self::new(MlpConfig::new(in_features, n_classes))
    }

    /// Linear output of width `out_features`
    pub fn regressor(in_features: usize, out_features: usize) -> Self {
        let mut config = MlpConfig::new(in_features, out_features);
        config.output = OutputActivation::Identity;
        Self::new(config)
    }
}

impl ModuleFactory for MlpFactory {
    fn build(&self, kwargs: &Params, seed: u64) -> Result<Box<dyn Module>> {
        Ok(Box::new(Mlp::new(self.base.with_kwargs(kwargs)?, seed)))
    }

    fn name(&self) -> String {
        "Mlp".to_string()
    }
}
