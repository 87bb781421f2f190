//! The interface an outer configuration search programs against.

use arbor_forest::{FeatureMatrix, Probabilities, Targets};
use arbor_space::{Configuration, ConfigurationSpace};

use crate::error::AdapterError;
use crate::properties::Properties;

/// A classifier that can be built from a sampled configuration and trained
/// in increments.
pub trait ClassificationAlgorithm: Sized {
    /// Describe what the algorithm can handle.
    fn properties() -> Properties;

    /// Describe the tunable hyperparameters and their defaults.
    fn hyperparameter_search_space() -> ConfigurationSpace;

    /// Build an unfitted instance from a configuration of the search space.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::MissingHyperparameter`] when a recognized
    /// name is absent. Values are not checked here.
    fn from_configuration(
        config: &Configuration,
        random_state: Option<u64>,
        n_jobs: Option<usize>,
    ) -> Result<Self, AdapterError>;

    /// Train `increment` more units of work, starting over when `refit` is set.
    ///
    /// # Errors
    ///
    /// Implementation specific; see the implementor.
    fn iterative_fit(
        &mut self,
        x: &FeatureMatrix,
        y: &Targets,
        sample_weight: Option<&[f64]>,
        increment: usize,
        refit: bool,
    ) -> Result<&mut Self, AdapterError>;

    /// Return `true` once a first incremental fit has happened.
    fn is_fitted(&self) -> bool;

    /// Return `true` once no further increment would change the model.
    fn configuration_fully_fitted(&self) -> bool;

    /// Predict one label per row.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::NotFitted`] before the first fit.
    fn predict(&self, x: &FeatureMatrix) -> Result<Targets, AdapterError>;

    /// Predict one class distribution per row.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::NotFitted`] before the first fit.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Probabilities, AdapterError>;

    /// Train one unit at a time until fully fitted.
    ///
    /// Starts with a fresh model when nothing is fitted yet or `refit` is set.
    ///
    /// # Errors
    ///
    /// Propagates the first error of [`iterative_fit`](Self::iterative_fit).
    fn fit(
        &mut self,
        x: &FeatureMatrix,
        y: &Targets,
        sample_weight: Option<&[f64]>,
        refit: bool,
    ) -> Result<&mut Self, AdapterError> {
        if !self.is_fitted() || refit {
            self.iterative_fit(x, y, sample_weight, 1, refit)?;
        }
        while !self.configuration_fully_fitted() {
            self.iterative_fit(x, y, sample_weight, 1, false)?;
        }
        Ok(self)
    }
}
