//! The `NeuralNet` struct, its top-level configuration and accessors

use crate::callbacks::{Callback, CallbackList};
use crate::criterion::{Criterion, CriterionFactory, CriterionKind};
use crate::dataset::{CVSplit, DatasetFactory, DefaultDatasetFactory};
use crate::device::Device;
use crate::history::History;
use crate::module::{Module, ModuleFactory};
use crate::optim::{Optimizer, OptimizerFactory, OptimizerKind};
use crate::params::{route, ParamValue, Params};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Plain keys a net accepts
pub const TOP_LEVEL_KEYS: [&str; 10] = [
    "lr",
    "max_epochs",
    "batch_size",
    "warm_start",
    "verbose",
    "device",
    "train_split",
    "seed",
    "criterion",
    "optimizer",
];

/// Components reachable through `<prefix>__<key>`
pub const PREFIXES: [&str; 7] = [
    "module",
    "criterion",
    "optimizer",
    "callbacks",
    "dataset",
    "iterator_train",
    "iterator_valid",
];

/// Which estimator flavour a net is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetKind {
    #[default]
    #[serde(rename = "net")]
    Base,
    Classifier,
    Regressor,
}

impl NetKind {
    pub fn name(self) -> &'static str {
        match self {
            NetKind::Base => "NeuralNet",
            NetKind::Classifier => "NeuralNetClassifier",
            NetKind::Regressor => "NeuralNetRegressor",
        }
    }

    pub(crate) fn default_criterion(self) -> CriterionKind {
        match self {
            NetKind::Classifier => CriterionKind::Nll,
            NetKind::Base | NetKind::Regressor => CriterionKind::Mse,
        }
    }
}

/// Parsed top-level hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct NetConfig {
    pub lr: f64,
    pub max_epochs: usize,
    /// `-1` batches the whole dataset
    pub batch_size: i64,
    pub warm_start: bool,
    pub verbose: i64,
    pub device: Device,
    pub train_split: Option<CVSplit>,
    pub seed: u64,
    /// Named criterion overriding the net's criterion factory
    pub criterion: Option<CriterionKind>,
    /// Named optimizer overriding the net's optimizer factory
    pub optimizer: Option<OptimizerKind>,
}

impl NetConfig {
    /// Defaults of every plain key except `criterion` and `optimizer`
    pub fn defaults() -> Params {
        Params::new()
            .with("lr", 0.01)
            .with("max_epochs", 10)
            .with("batch_size", 128)
            .with("warm_start", false)
            .with("verbose", 1)
            .with("device", "cpu")
            .with("train_split", 0.2)
            .with("seed", 0)
    }

    pub fn from_params(top: &Params) -> Result<Self> {
        let mut params = Self::defaults();
        params.extend(top);

        let batch_size = params.i64_or("batch_size", 128)?;
        if batch_size != -1 && batch_size <= 0 {
            return Err(Error::InvalidValue {
                key: "batch_size".into(),
                reason: format!("must be positive or -1, got {batch_size}"),
            });
        }
        let seed = params.usize_or("seed", 0)? as u64;
        let train_split = match params.get("train_split") {
            Some(value) => CVSplit::from_param(value)?.map(|split| split.with_seed(seed)),
            None => None,
        };
        let named = |key: &str| -> Option<&str> {
            params.get(key).filter(|v| !v.is_null()).and_then(ParamValue::as_str)
        };
        for key in ["criterion", "optimizer"] {
            if let Some(value) = params.get(key) {
                if !value.is_null() && value.as_str().is_none() {
                    return Err(Error::InvalidValue {
                        key: key.into(),
                        reason: format!("expected a name, got {value}"),
                    });
                }
            }
        }
        Ok(Self {
            lr: params.f64_or("lr", 0.01)?,
            max_epochs: params.usize_or("max_epochs", 10)?,
            batch_size,
            warm_start: params.bool_or("warm_start", false)?,
            verbose: params.i64_or("verbose", 1)?,
            device: params.str_or("device", "cpu")?.parse()?,
            train_split,
            seed,
            criterion: named("criterion").map(str::parse).transpose()?,
            optimizer: named("optimizer").map(str::parse).transpose()?,
        })
    }
}

/// Where the net's module comes from
#[derive(Clone)]
pub enum ModuleSource {
    /// Built fresh on every initialization
    Factory(Arc<dyn ModuleFactory>),
    /// A ready module, used as-is unless `module__*` params are set
    Instance(Box<dyn Module>),
}

/// Estimator wrapping a module, criterion and optimizer in a callback-driven
/// fit loop
///
/// Configuration is a flat [`Params`] map: plain keys such as `lr` or
/// `max_epochs`, and compound keys `<component>__<key>` routed into the
/// module, criterion, optimizer, callbacks, dataset and iterators. Unknown
/// keys are rejected when the net is built.
///
/// # Example
///
/// ```
/// use skorch::module::MlpFactory;
/// use skorch::net::NeuralNet;
/// use skorch::params::Params;
///
/// let params = Params::new().with("max_epochs", 3).with("module__num_units", 20);
/// let net = NeuralNet::new(MlpFactory::regressor(4, 1), params).unwrap();
/// assert!(!net.is_initialized());
/// assert!(NeuralNet::new(MlpFactory::regressor(4, 1), Params::new().with("mxa_epochs", 3)).is_err());
/// ```
#[derive(Clone)]
pub struct NeuralNet {
    pub(crate) kind: NetKind,
    pub(crate) module_fn: ModuleSource,
    pub(crate) criterion_fn: Arc<dyn CriterionFactory>,
    pub(crate) optimizer_fn: Arc<dyn OptimizerFactory>,
    pub(crate) dataset_fn: Arc<dyn DatasetFactory>,
    /// Every param given at construction or through `set_params`
    pub(crate) params: Params,
    pub(crate) config: NetConfig,
    pub(crate) user_callbacks: Vec<(String, Box<dyn Callback>)>,
    /// Slots replaced through `set_callback`
    pub(crate) slot_overrides: Vec<(String, Option<Box<dyn Callback>>)>,

    pub(crate) callbacks: CallbackList,
    pub(crate) module: Option<Box<dyn Module>>,
    pub(crate) criterion: Option<Box<dyn Criterion>>,
    pub(crate) optimizer: Option<Box<dyn Optimizer>>,
    pub(crate) history: History,
    pub(crate) device: Device,
    pub(crate) rng: StdRng,
    pub(crate) initialized: bool,
}

impl NeuralNet {
    /// Net building its module with `factory`
    pub fn new(factory: impl ModuleFactory + 'static, params: Params) -> Result<Self> {
        Self::build(NetKind::Base, ModuleSource::Factory(Arc::new(factory)), params)
    }

    /// Net around an existing module
    pub fn from_module(module: Box<dyn Module>, params: Params) -> Result<Self> {
        Self::build(NetKind::Base, ModuleSource::Instance(module), params)
    }

    pub(crate) fn build(kind: NetKind, module_fn: ModuleSource, params: Params) -> Result<Self> {
        let routed = route(&params, &TOP_LEVEL_KEYS, &PREFIXES);
        if !routed.unknown.is_empty() {
            return Err(Error::UnknownArguments(routed.unknown));
        }
        let config = NetConfig::from_params(&routed.top)?;
        Ok(Self {
            kind,
            module_fn,
            criterion_fn: Arc::new(kind.default_criterion()),
            optimizer_fn: Arc::new(OptimizerKind::Sgd),
            dataset_fn: Arc::new(DefaultDatasetFactory),
            params,
            rng: StdRng::seed_from_u64(config.seed),
            device: config.device,
            config,
            user_callbacks: Vec::new(),
            slot_overrides: Vec::new(),
            callbacks: CallbackList::new(),
            module: None,
            criterion: None,
            optimizer: None,
            history: History::new(),
            initialized: false,
        })
    }

    pub fn with_criterion(mut self, factory: impl CriterionFactory + 'static) -> Self {
        self.criterion_fn = Arc::new(factory);
        self
    }

    pub fn with_optimizer(mut self, factory: impl OptimizerFactory + 'static) -> Self {
        self.optimizer_fn = Arc::new(factory);
        self
    }

    pub fn with_dataset(mut self, factory: impl DatasetFactory + 'static) -> Self {
        self.dataset_fn = Arc::new(factory);
        self
    }

    /// Add a user callback under `name`; user callbacks fire after the
    /// defaults and before `print_log`
    pub fn with_callback(mut self, name: impl Into<String>, callback: impl Callback + 'static) -> Self {
        self.user_callbacks.push((name.into(), Box::new(callback)));
        self
    }

    /// Add a user callback named after its type
    pub fn add_callback(mut self, callback: impl Callback + 'static) -> Self {
        let name = callback.type_name().to_string();
        self.user_callbacks.push((name, Box::new(callback)));
        self
    }

    /// Same configuration, components and callbacks, with no trained state
    pub fn clone_unfitted(&self) -> Self {
        Self {
            callbacks: CallbackList::new(),
            module: None,
            criterion: None,
            optimizer: None,
            history: History::new(),
            device: self.config.device,
            rng: StdRng::seed_from_u64(self.config.seed),
            initialized: false,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> NetKind {
        self.kind
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn verbose(&self) -> i64 {
        self.config.verbose
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Initialized callbacks in firing order
    pub fn callbacks(&self) -> &CallbackList {
        &self.callbacks
    }

    pub fn module(&self) -> Option<&dyn Module> {
        self.module.as_deref()
    }

    pub fn criterion(&self) -> Option<&dyn Criterion> {
        self.criterion.as_deref()
    }

    pub fn optimizer(&self) -> Option<&dyn Optimizer> {
        self.optimizer.as_deref()
    }

    pub fn optimizer_mut(&mut self) -> Result<&mut Box<dyn Optimizer>> {
        let kind = self.kind;
        self.optimizer.as_mut().ok_or_else(|| not_initialized(kind))
    }

    /// Device in use after initialization
    pub fn device(&self) -> Device {
        self.device
    }

    pub(crate) fn not_initialized(&self) -> Error {
        not_initialized(self.kind)
    }

    pub(crate) fn criterion_factory(&self) -> Arc<dyn CriterionFactory> {
        match self.config.criterion {
            Some(kind) => Arc::new(kind),
            None => Arc::clone(&self.criterion_fn),
        }
    }

    pub(crate) fn optimizer_factory(&self) -> Arc<dyn OptimizerFactory> {
        match self.config.optimizer {
            Some(kind) => Arc::new(kind),
            None => Arc::clone(&self.optimizer_fn),
        }
    }

    fn module_repr(&self) -> String {
        match (&self.module, &self.module_fn) {
            (Some(module), _) => module.describe(),
            (None, ModuleSource::Factory(f)) => f.name(),
            (None, ModuleSource::Instance(m)) => m.describe(),
        }
    }
}

pub(crate) fn not_initialized(kind: NetKind) -> Error {
    Error::NotInitialized(format!(
        "This {} instance is not initialized yet. Call 'initialize' or 'fit' with \
         appropriate arguments before using this method.",
        kind.name()
    ))
}

impl fmt::Display for NeuralNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.initialized { "initialized" } else { "uninitialized" };
        writeln!(f, "<{}>[{state}](", self.kind.name())?;
        let key = if self.initialized { "module_" } else { "module" };
        writeln!(f, "  {key}={},", self.module_repr())?;
        for (k, v) in self.params.iter() {
            writeln!(f, "  {k}={v},")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for NeuralNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.kind.name())
            .field("initialized", &self.initialized)
            .field("params", &self.params)
            .field("callbacks", &self.callbacks)
            .field("epochs", &self.history.len())
            .finish()
    }
}
