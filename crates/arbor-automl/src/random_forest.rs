//! Random forest classifier adapter with incremental fitting.

use arbor_forest::{FeatureMatrix, Probabilities, RandomForestClassifier, Targets};
use arbor_space::{Configuration, ConfigurationSpace, Hyperparameter};
use tracing::{debug, info, instrument};

use crate::algorithm::ClassificationAlgorithm;
use crate::error::AdapterError;
use crate::hyperparams::{NormalizedConfig, RawConfig};
use crate::properties::{DataLayout, Dtype, OutputKind, Properties};

/// Default step size an outer search may use for `iterative_fit`.
pub const ESTIMATOR_INCREMENT: usize = 10;

/// Normalized hyperparameters and the engine built from them.
#[derive(Debug, Clone)]
struct FittedState {
    normalized: NormalizedConfig,
    estimator: RandomForestClassifier,
}

impl FittedState {
    /// Raise the engine target by `increment`, never past `n_estimators`.
    ///
    /// The engine is left untouched when the target does not move. On engine
    /// failure the previous target is restored.
    fn grow(
        &mut self,
        x: &FeatureMatrix,
        y: &Targets,
        sample_weight: Option<&[f64]>,
        increment: usize,
    ) -> Result<(), AdapterError> {
        let current = self.estimator.config().n_estimators();
        let target = current
            .saturating_add(increment)
            .min(self.normalized.n_estimators);
        if target == current {
            debug!(n_trained = self.estimator.n_trained(), "forest already complete");
            return Ok(());
        }

        self.estimator.set_n_estimators(target);
        if let Err(err) = self.estimator.fit(x, y, sample_weight) {
            self.estimator.set_n_estimators(current);
            return Err(err.into());
        }
        debug!(
            n_trained = self.estimator.n_trained(),
            n_estimators = self.normalized.n_estimators,
            "forest grown"
        );
        Ok(())
    }
}

/// A random forest classifier that grows its ensemble in increments.
///
/// Holds the raw hyperparameters verbatim. The first call to
/// [`iterative_fit`](ClassificationAlgorithm::iterative_fit) normalizes them
/// against the training data and creates an empty warm-starting forest;
/// every call then adds trees until `n_estimators` is reached.
#[derive(Debug, Clone)]
pub struct RandomForest {
    raw: RawConfig,
    random_state: Option<u64>,
    n_jobs: Option<usize>,
    fitted: Option<FittedState>,
}

impl RandomForest {
    /// Store the inputs without validating or coercing them.
    ///
    /// `random_state = None` draws a fresh seed at first fit.
    #[must_use]
    pub fn new(raw: RawConfig, random_state: Option<u64>, n_jobs: Option<usize>) -> Self {
        Self {
            raw,
            random_state,
            n_jobs,
            fitted: None,
        }
    }

    /// Return the hyperparameters as received.
    #[must_use]
    pub fn raw_config(&self) -> &RawConfig {
        &self.raw
    }

    /// Return the normalized hyperparameters once fitting has started.
    #[must_use]
    pub fn normalized_config(&self) -> Option<&NormalizedConfig> {
        self.fitted.as_ref().map(|f| &f.normalized)
    }

    /// Return the underlying forest once fitting has started.
    #[must_use]
    pub fn estimator(&self) -> Option<&RandomForestClassifier> {
        self.fitted.as_ref().map(|f| &f.estimator)
    }

    /// Hand over the underlying forest, e.g. for persistence.
    #[must_use]
    pub fn into_estimator(self) -> Option<RandomForestClassifier> {
        self.fitted.map(|f| f.estimator)
    }

    /// Return the number of trees trained so far; 0 before the first fit.
    #[must_use]
    pub fn trained_tree_count(&self) -> usize {
        self.estimator().map_or(0, RandomForestClassifier::n_trained)
    }

    /// Return the default increment, [`ESTIMATOR_INCREMENT`].
    #[must_use]
    pub fn estimator_increment(&self) -> usize {
        ESTIMATOR_INCREMENT
    }

    /// Return the seed given at construction.
    #[must_use]
    pub fn random_state(&self) -> Option<u64> {
        self.random_state
    }

    /// Return the parallelism hint given at construction.
    #[must_use]
    pub fn n_jobs(&self) -> Option<usize> {
        self.n_jobs
    }

    fn initial_state(&self, num_attributes: usize) -> Result<FittedState, AdapterError> {
        let normalized = self.raw.normalize(num_attributes)?;
        let seed = self.random_state.unwrap_or_else(rand::random);
        let estimator = normalized.engine_config(seed, self.n_jobs).build();
        info!(
            n_estimators = normalized.n_estimators,
            max_features = ?normalized.max_features,
            bootstrap = normalized.bootstrap,
            seed,
            "estimator created"
        );
        Ok(FittedState {
            normalized,
            estimator,
        })
    }

    fn fitted(&self) -> Result<&FittedState, AdapterError> {
        self.fitted.as_ref().ok_or(AdapterError::NotFitted)
    }
}

impl Default for RandomForest {
    /// Search-space defaults, no fixed seed, one job.
    fn default() -> Self {
        Self::new(RawConfig::default(), None, Some(1))
    }
}

impl ClassificationAlgorithm for RandomForest {
    fn properties() -> Properties {
        Properties {
            name: "Random Forest Classifier".into(),
            short_name: "RF".into(),
            input: vec![DataLayout::Dense, DataLayout::Sparse],
            output: OutputKind::Predictions,
            handles_missing_values: false,
            handles_nominal_values: false,
            handles_numerical_features: true,
            prefers_data_scaled: false,
            prefers_data_normalized: false,
            handles_regression: false,
            handles_classification: true,
            handles_multiclass: true,
            handles_multilabel: true,
            is_deterministic: true,
            handles_sparse: true,
            preferred_dtype: Dtype::Float32,
        }
    }

    fn hyperparameter_search_space() -> ConfigurationSpace {
        let hyperparameters = [
            Ok(Hyperparameter::constant("n_estimators", 100_i64)),
            Hyperparameter::categorical(
                "criterion",
                vec!["gini".into(), "entropy".into()],
                "gini",
            ),
            Hyperparameter::uniform_float("max_features", 0.5, 5.0, 1.0, false),
            Ok(Hyperparameter::unparametrized("max_depth", "None")),
            Hyperparameter::uniform_integer("min_samples_split", 2, 20, 2, false),
            Hyperparameter::uniform_integer("min_samples_leaf", 1, 20, 1, false),
            Ok(Hyperparameter::unparametrized("min_weight_fraction_leaf", 0.0)),
            Ok(Hyperparameter::unparametrized("max_leaf_nodes", "None")),
            Hyperparameter::categorical("bootstrap", vec!["True".into(), "False".into()], "True"),
        ];

        let mut space = ConfigurationSpace::new("random_forest");
        for hp in hyperparameters {
            let hp = hp.expect("random forest hyperparameter definitions are valid");
            space
                .add_hyperparameter(hp)
                .expect("random forest hyperparameter names are unique");
        }
        space
    }

    fn from_configuration(
        config: &Configuration,
        random_state: Option<u64>,
        n_jobs: Option<usize>,
    ) -> Result<Self, AdapterError> {
        Ok(Self::new(
            RawConfig::from_configuration(config)?,
            random_state,
            n_jobs,
        ))
    }

    /// Add up to `increment` trees, never growing past `n_estimators`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AdapterError::InvalidIncrement`] | `increment == 0` |
    /// | [`AdapterError::Conversion`] | a raw value cannot be coerced (first fit only) |
    /// | [`AdapterError::Engine`] | the forest rejects the data or hyperparameters |
    #[instrument(skip_all, fields(increment = increment, refit = refit, n_samples = x.n_rows()))]
    fn iterative_fit(
        &mut self,
        x: &FeatureMatrix,
        y: &Targets,
        sample_weight: Option<&[f64]>,
        increment: usize,
        refit: bool,
    ) -> Result<&mut Self, AdapterError> {
        if increment == 0 {
            return Err(AdapterError::InvalidIncrement);
        }
        if refit {
            self.fitted = None;
        }

        let mut state = match self.fitted.take() {
            Some(state) => state,
            None => self.initial_state(x.n_cols())?,
        };
        let grown = state.grow(x, y, sample_weight, increment);
        // A forest with no trees is not a fit; the next call normalizes again.
        if grown.is_ok() || state.estimator.n_trained() > 0 {
            self.fitted = Some(state);
        }
        grown?;
        Ok(self)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn configuration_fully_fitted(&self) -> bool {
        self.fitted
            .as_ref()
            .is_some_and(|f| f.estimator.n_trained() >= f.normalized.n_estimators)
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Targets, AdapterError> {
        Ok(self.fitted()?.estimator.predict(x)?)
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Probabilities, AdapterError> {
        Ok(self.fitted()?.estimator.predict_proba(x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (FeatureMatrix, Targets) {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![f64::from(i), f64::from(i % 7), f64::from(i % 3)])
            .collect();
        let labels = (0..40).map(|i| i64::from(i >= 20)).collect();
        (FeatureMatrix::Dense(rows), Targets::Single(labels))
    }

    fn small(n_estimators: i64) -> RandomForest {
        let raw = RawConfig {
            n_estimators: n_estimators.into(),
            ..RawConfig::default()
        };
        RandomForest::new(raw, Some(1), Some(1))
    }

    #[test]
    fn first_call_normalizes_and_builds_engine() {
        let (x, y) = toy();
        let mut rf = small(5);
        assert!(rf.normalized_config().is_none());
        rf.iterative_fit(&x, &y, None, 2, false).unwrap();
        // 3 attributes: min(3 / 2, trunc(ln 3 + 1)) = 1.
        assert_eq!(
            rf.normalized_config().unwrap().max_features,
            arbor_forest::MaxFeatures::Fixed(1)
        );
        assert_eq!(rf.trained_tree_count(), 2);
        assert!(rf.estimator().unwrap().config().warm_start());
    }

    #[test]
    fn zero_increment_is_rejected() {
        let (x, y) = toy();
        let err = small(5).iterative_fit(&x, &y, None, 0, false).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidIncrement));
    }

    #[test]
    fn clamp_stops_at_n_estimators() {
        let (x, y) = toy();
        let mut rf = small(5);
        rf.iterative_fit(&x, &y, None, 3, false)
            .unwrap()
            .iterative_fit(&x, &y, None, 3, false)
            .unwrap();
        assert_eq!(rf.trained_tree_count(), 5);
        assert_eq!(rf.estimator().unwrap().config().n_estimators(), 5);
        rf.iterative_fit(&x, &y, None, 3, false).unwrap();
        assert_eq!(rf.trained_tree_count(), 5);
    }

    #[test]
    fn engine_failure_restores_target() {
        let (x, y) = toy();
        let mut rf = small(6);
        rf.iterative_fit(&x, &y, None, 2, false).unwrap();
        let wrong = Targets::Single(vec![0; 3]);
        let err = rf.iterative_fit(&x, &wrong, None, 2, false).unwrap_err();
        assert!(matches!(err, AdapterError::Engine(_)));
        assert_eq!(rf.estimator().unwrap().config().n_estimators(), 2);
        rf.iterative_fit(&x, &y, None, 2, false).unwrap();
        assert_eq!(rf.trained_tree_count(), 4);
    }

    #[test]
    fn conversion_error_leaves_adapter_unfitted() {
        let (x, y) = toy();
        let raw = RawConfig {
            max_depth: "unbounded".into(),
            ..RawConfig::default()
        };
        let mut rf = RandomForest::new(raw, None, None);
        let err = rf.iterative_fit(&x, &y, None, 1, false).unwrap_err();
        assert!(matches!(err, AdapterError::Conversion { name: "max_depth", .. }));
        assert!(!rf.is_fitted());
    }

    #[test]
    fn search_space_is_complete() {
        let space = RandomForest::hyperparameter_search_space();
        assert_eq!(space.name(), "random_forest");
        assert_eq!(space.len(), 9);
        assert_eq!(
            RawConfig::from_configuration(&space.default_configuration()).unwrap(),
            RawConfig::default()
        );
    }
}
