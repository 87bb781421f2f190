//! Hyperparameter builder for Random Forest training.

use serde::{Deserialize, Serialize};

use crate::error::RfError;
use crate::forest::RandomForestClassifier;
use crate::split::SplitCriterion;
use crate::tree::DecisionTreeConfig;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve the strategy to a feature count for `n_features` columns.
    ///
    /// Derived counts are floored and never drop below 1; `Fixed` is
    /// returned as given.
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        match self {
            MaxFeatures::Sqrt => (n.sqrt().floor() as usize).max(1),
            MaxFeatures::Log2 => (n.log2().floor() as usize).max(1),
            MaxFeatures::Fraction(f) => ((f * n).floor() as usize).max(1),
            MaxFeatures::Fixed(k) => k,
            MaxFeatures::All => n_features,
        }
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter                  | Default     |
/// |----------------------------|-------------|
/// | `criterion`                | `Gini`      |
/// | `max_features`             | `Sqrt`      |
/// | `max_depth`                | `None`      |
/// | `min_samples_split`        | 2           |
/// | `min_samples_leaf`         | 1           |
/// | `min_weight_fraction_leaf` | 0.0         |
/// | `max_leaf_nodes`           | `None`      |
/// | `bootstrap`                | `true`      |
/// | `seed`                     | 42          |
/// | `n_jobs`                   | `None`      |
/// | `warm_start`               | `false`     |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub(crate) n_estimators: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_weight_fraction_leaf: f64,
    pub(crate) max_leaf_nodes: Option<usize>,
    pub(crate) bootstrap: bool,
    pub(crate) seed: u64,
    pub(crate) n_jobs: Option<usize>,
    pub(crate) warm_start: bool,
}

impl RandomForestConfig {
    /// Create a new config targeting `n_estimators` trees.
    ///
    /// Zero is accepted here so a warm-started forest can begin empty; a
    /// cold fit still rejects it.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            criterion: SplitCriterion::Gini,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_weight_fraction_leaf: 0.0,
            max_leaf_nodes: None,
            bootstrap: true,
            seed: 42,
            n_jobs: None,
            warm_start: false,
        }
    }

    // --- Setters ---

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the minimum share of the total sample weight each leaf must hold.
    #[must_use]
    pub fn with_min_weight_fraction_leaf(mut self, fraction: f64) -> Self {
        self.min_weight_fraction_leaf = fraction;
        self
    }

    /// Cap the leaf count. `Some(_)` switches trees to best-first growth.
    #[must_use]
    pub fn with_max_leaf_nodes(mut self, max_leaf_nodes: Option<usize>) -> Self {
        self.max_leaf_nodes = max_leaf_nodes;
        self
    }

    /// Enable or disable bootstrap resampling per tree.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train on a dedicated pool of `n_jobs` threads. `None` uses the global pool.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Keep already trained trees across calls to `fit`.
    #[must_use]
    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    /// Wrap this config in an unfitted classifier.
    #[must_use]
    pub fn build(self) -> RandomForestClassifier {
        RandomForestClassifier::new(self)
    }

    // --- Getters ---

    /// Return the target number of trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the minimum weight fraction per leaf.
    #[must_use]
    pub fn min_weight_fraction_leaf(&self) -> f64 {
        self.min_weight_fraction_leaf
    }

    /// Return the leaf cap, if any.
    #[must_use]
    pub fn max_leaf_nodes(&self) -> Option<usize> {
        self.max_leaf_nodes
    }

    /// Return whether trees see bootstrap resamples.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the dedicated worker count, if any.
    #[must_use]
    pub fn n_jobs(&self) -> Option<usize> {
        self.n_jobs
    }

    /// Return whether warm start is enabled.
    #[must_use]
    pub fn warm_start(&self) -> bool {
        self.warm_start
    }

    /// Check every hyperparameter and resolve `max_features` for `n_features`.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                         |
    /// |------------------------------------------|----------------------------------------------|
    /// | [`RfError::InvalidMaxDepth`]             | `max_depth` is `Some(0)`                     |
    /// | [`RfError::InvalidMinSamplesSplit`]      | `min_samples_split < 2`                      |
    /// | [`RfError::InvalidMinSamplesLeaf`]       | `min_samples_leaf == 0`                      |
    /// | [`RfError::InvalidMinWeightFractionLeaf`]| fraction outside `[0.0, 0.5]`                |
    /// | [`RfError::InvalidMaxLeafNodes`]         | `max_leaf_nodes` is `Some(n)` with `n < 2`   |
    /// | [`RfError::InvalidJobCount`]             | `n_jobs` is `Some(0)`                        |
    /// | [`RfError::InvalidMaxFeatures`]          | resolved count outside `[1, n_features]`     |
    pub fn validate(&self, n_features: usize) -> Result<usize, RfError> {
        if let Some(max_depth) = self.max_depth
            && max_depth == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        if !(0.0..=0.5).contains(&self.min_weight_fraction_leaf) {
            return Err(RfError::InvalidMinWeightFractionLeaf {
                fraction: self.min_weight_fraction_leaf,
            });
        }
        if let Some(max_leaf_nodes) = self.max_leaf_nodes
            && max_leaf_nodes < 2
        {
            return Err(RfError::InvalidMaxLeafNodes { max_leaf_nodes });
        }
        if let Some(n_jobs) = self.n_jobs
            && n_jobs == 0
        {
            return Err(RfError::InvalidJobCount { n_jobs });
        }
        if let MaxFeatures::Fraction(f) = self.max_features
            && !(f > 0.0 && f <= 1.0)
        {
            return Err(RfError::InvalidMaxFeatures {
                max_features: self.max_features.resolve(n_features),
                n_features,
            });
        }
        let max_features = self.max_features.resolve(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }

    pub(crate) fn tree_config(&self) -> DecisionTreeConfig {
        DecisionTreeConfig {
            criterion: self.criterion,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            min_weight_fraction_leaf: self.min_weight_fraction_leaf,
            max_leaf_nodes: self.max_leaf_nodes,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_table() {
        let config = RandomForestConfig::new(10);
        assert_eq!(config.n_estimators(), 10);
        assert_eq!(config.criterion(), SplitCriterion::Gini);
        assert_eq!(config.max_features(), MaxFeatures::Sqrt);
        assert!(config.bootstrap());
        assert!(!config.warm_start());
        assert_eq!(config.n_jobs(), None);
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
        assert_eq!(MaxFeatures::Log2.resolve(10), 3);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10), 5);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(10), 1);
        assert_eq!(MaxFeatures::Fixed(4).resolve(10), 4);
        assert_eq!(MaxFeatures::All.resolve(10), 10);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = RandomForestConfig::new(5);
        assert!(matches!(
            base.clone().with_max_depth(Some(0)).validate(4),
            Err(RfError::InvalidMaxDepth { max_depth: 0 })
        ));
        assert!(matches!(
            base.clone().with_min_samples_split(1).validate(4),
            Err(RfError::InvalidMinSamplesSplit { .. })
        ));
        assert!(matches!(
            base.clone().with_min_samples_leaf(0).validate(4),
            Err(RfError::InvalidMinSamplesLeaf { .. })
        ));
        assert!(matches!(
            base.clone().with_min_weight_fraction_leaf(0.6).validate(4),
            Err(RfError::InvalidMinWeightFractionLeaf { .. })
        ));
        assert!(matches!(
            base.clone().with_max_leaf_nodes(Some(1)).validate(4),
            Err(RfError::InvalidMaxLeafNodes { max_leaf_nodes: 1 })
        ));
        assert!(matches!(
            base.clone().with_n_jobs(Some(0)).validate(4),
            Err(RfError::InvalidJobCount { n_jobs: 0 })
        ));
        assert!(matches!(
            base.clone().with_max_features(MaxFeatures::Fixed(5)).validate(4),
            Err(RfError::InvalidMaxFeatures { max_features: 5, n_features: 4 })
        ));
        assert!(matches!(
            base.with_max_features(MaxFeatures::Fraction(1.5)).validate(4),
            Err(RfError::InvalidMaxFeatures { .. })
        ));
    }

    #[test]
    fn validate_returns_resolved_count() {
        let config = RandomForestConfig::new(5).with_max_features(MaxFeatures::Fixed(2));
        assert_eq!(config.validate(8).unwrap(), 2);
    }
}
