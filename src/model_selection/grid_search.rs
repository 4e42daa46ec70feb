//! Exhaustive search over parameter combinations with cross-validation

use super::estimator::Estimator;
use super::kfold::KFold;
use crate::dataset::Target;
use crate::helper::Inputs;
use crate::params::{ParamValue, Params};
use crate::{Error, Result};
use ndarray::Array2;
use tracing::info;

/// Candidate values per parameter key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<V: Into<ParamValue>>(mut self, key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.axes.push((key.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Every combination, varying the last key fastest
    pub fn candidates(&self) -> Vec<Params> {
        cartesian_product(&self.axes)
    }
}

fn cartesian_product(axes: &[(String, Vec<ParamValue>)]) -> Vec<Params> {
    let Some(((key, values), rest)) = axes.split_first() else {
        return vec![Params::new()];
    };
    let rest = cartesian_product(rest);
    values
        .iter()
        .flat_map(|v| {
            rest.iter().map(move |tail| {
                let mut params = Params::new().with(key.clone(), v.clone());
                params.extend(tail);
                params
            })
        })
        .collect()
}

/// Scores of one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct CvResult {
    pub params: Params,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Grid search with k-fold cross-validation
///
/// Each candidate is applied with `set_params` to a fresh unfitted copy of
/// the estimator for every fold. The best candidate has the highest mean
/// test score; with `refit` it is trained once more on all data.
pub struct GridSearchCV {
    estimator: Box<dyn Estimator>,
    grid: ParamGrid,
    pub cv: KFold,
    pub refit: bool,
    results: Vec<CvResult>,
    best_index: Option<usize>,
    best_estimator: Option<Box<dyn Estimator>>,
}

impl GridSearchCV {
    pub fn new(estimator: Box<dyn Estimator>, grid: ParamGrid) -> Self {
        Self {
            estimator,
            grid,
            cv: KFold::new(3),
            refit: true,
            results: Vec::new(),
            best_index: None,
            best_estimator: None,
        }
    }

    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    /// Score every candidate on every fold of `x`, which may be a matrix or
    /// a [`SliceDict`](crate::helper::SliceDict)
    pub fn fit<X: Inputs>(&mut self, x: &X, y: &Target) -> Result<&mut Self> {
        let folds = self.cv.split(x.n_rows(), Some(y))?;
        let candidates = self.grid.candidates();
        let mut results = Vec::with_capacity(candidates.len());
        for params in candidates {
            let mut fold_scores = Vec::with_capacity(folds.len());
            for fold in &folds {
                let mut estimator = self.estimator.clone_unfitted();
                estimator.set_params(&params)?;
                let train = x.select_rows(&fold.train);
                estimator.fit(&*train.to_features()?, &y.select(&fold.train))?;
                let test = x.select_rows(&fold.test);
                fold_scores.push(estimator.score(&*test.to_features()?, &y.select(&fold.test))?);
            }
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            info!(params = %params, mean_score, "grid search candidate");
            results.push(CvResult { params, fold_scores, mean_score });
        }
        let best_index = results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.mean_score.is_nan())
            .max_by(|(_, a), (_, b)| a.mean_score.total_cmp(&b.mean_score))
            .map(|(i, _)| i);

        self.best_estimator = None;
        if let (true, Some(best)) = (self.refit, best_index) {
            let mut estimator = self.estimator.clone_unfitted();
            estimator.set_params(&results[best].params)?;
            estimator.fit(&*x.to_features()?, y)?;
            self.best_estimator = Some(estimator);
        }
        self.results = results;
        self.best_index = best_index;
        Ok(self)
    }

    pub fn cv_results(&self) -> &[CvResult] {
        &self.results
    }

    pub fn best_params(&self) -> Option<&Params> {
        self.best_index.map(|i| &self.results[i].params)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_index.map(|i| self.results[i].mean_score)
    }

    pub fn best_estimator(&self) -> Option<&dyn Estimator> {
        self.best_estimator.as_deref()
    }

    fn refitted(&mut self) -> Result<&mut Box<dyn Estimator>> {
        self.best_estimator.as_mut().ok_or_else(|| {
            Error::NotInitialized("GridSearchCV has no refitted estimator; call fit with refit enabled".into())
        })
    }

    pub fn predict<X: Inputs>(&mut self, x: &X) -> Result<Array2<f32>> {
        let features = x.to_features()?;
        self.refitted()?.predict(&features)
    }

    pub fn score<X: Inputs>(&mut self, x: &X, y: &Target) -> Result<f64> {
        let features = x.to_features()?;
        self.refitted()?.score(&features, y)
    }
}
