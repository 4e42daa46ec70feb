//! The estimator contract shared by nets, pipelines and searches

use crate::dataset::Target;
use crate::net::{NeuralNet, NeuralNetClassifier, NeuralNetRegressor};
use crate::params::Params;
use crate::Result;
use ndarray::Array2;

/// Anything that can be fitted, scored and reconfigured through [`Params`]
pub trait Estimator: Send {
    fn fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<()>;

    /// Model outputs; class probabilities for classifiers
    fn predict(&mut self, x: &Array2<f32>) -> Result<Array2<f32>>;

    /// Higher is better
    fn score(&mut self, x: &Array2<f32>, y: &Target) -> Result<f64>;

    fn get_params(&self) -> Params;

    fn set_params(&mut self, params: &Params) -> Result<()>;

    /// Copy with the same configuration and nothing learned
    fn clone_unfitted(&self) -> Box<dyn Estimator>;
}

impl Estimator for NeuralNet {
    fn fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<()> {
        NeuralNet::fit(self, x, Some(y)).map(|_| ())
    }

    fn predict(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        NeuralNet::predict(self, x)
    }

    fn score(&mut self, x: &Array2<f32>, y: &Target) -> Result<f64> {
        NeuralNet::score(self, x, y)
    }

    fn get_params(&self) -> Params {
        NeuralNet::get_params(self)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        NeuralNet::set_params(self, params).map(|_| ())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(NeuralNet::clone_unfitted(self))
    }
}

impl Estimator for NeuralNetClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<()> {
        NeuralNetClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.predict_proba(x)
    }

    fn score(&mut self, x: &Array2<f32>, y: &Target) -> Result<f64> {
        NeuralNet::score(self, x, y)
    }

    fn get_params(&self) -> Params {
        NeuralNet::get_params(self)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        NeuralNet::set_params(self, params).map(|_| ())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(NeuralNetClassifier::clone_unfitted(self))
    }
}

impl Estimator for NeuralNetRegressor {
    fn fit(&mut self, x: &Array2<f32>, y: &Target) -> Result<()> {
        NeuralNetRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        NeuralNet::predict(self, x)
    }

    fn score(&mut self, x: &Array2<f32>, y: &Target) -> Result<f64> {
        NeuralNet::score(self, x, y)
    }

    fn get_params(&self) -> Params {
        NeuralNet::get_params(self)
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        NeuralNet::set_params(self, params).map(|_| ())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(NeuralNetRegressor::clone_unfitted(self))
    }
}
