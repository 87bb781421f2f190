//! Random Forest training with parallel, warm-startable tree construction.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::matrix::FeatureMatrix;
use crate::target::Targets;
use crate::tree::{DecisionTree, TrainingData, resolve_sample_weights};

/// Layout of the data a forest was trained on.
///
/// A warm-started forest only accepts more trees for the same layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TrainingSchema {
    pub(crate) n_features: usize,
    /// Sorted distinct labels per output.
    pub(crate) classes: Vec<Vec<i64>>,
    pub(crate) multi_output: bool,
}

impl TrainingSchema {
    fn of(data: &TrainingData) -> Self {
        Self {
            n_features: data.n_features,
            classes: data.targets.classes.clone(),
            multi_output: data.targets.multi_output,
        }
    }

    fn mismatch(&self, other: &Self) -> Option<String> {
        if self.n_features != other.n_features {
            return Some(format!(
                "{} features, previously {}",
                other.n_features, self.n_features
            ));
        }
        if self.multi_output != other.multi_output || self.classes.len() != other.classes.len() {
            return Some(format!(
                "{} outputs, previously {}",
                other.classes.len(),
                self.classes.len()
            ));
        }
        if self.classes != other.classes {
            return Some("class labels differ from the first fit".into());
        }
        None
    }
}

/// A Random Forest classifier that can grow its ensemble across calls.
///
/// Built from a [`RandomForestConfig`]. With warm start enabled, each call to
/// [`fit`](Self::fit) keeps the trees already trained and adds only the
/// missing ones up to `n_estimators`.
///
/// The dedicated `n_jobs` pool is built on the first fit and reused by later
/// ones. Clones share it; it is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub(crate) config: RandomForestConfig,
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) schema: Option<TrainingSchema>,
    #[serde(skip)]
    pool: Option<Arc<rayon::ThreadPool>>,
}

/// Seed for tree `index`, independent of how many trees are trained per call.
pub(crate) fn tree_seed(seed: u64, index: usize) -> u64 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index as u64);
    rng.r#gen()
}

/// Draw `n` samples with replacement and scale each weight by its draw count.
fn bootstrap_weights(weights: &[f64], rng: &mut impl Rng) -> Vec<f64> {
    let n_samples = weights.len();
    let mut counts = vec![0u32; n_samples];
    for _ in 0..n_samples {
        counts[rng.gen_range(0..n_samples)] += 1;
    }
    weights
        .iter()
        .zip(&counts)
        .map(|(&w, &c)| w * f64::from(c))
        .collect()
}

impl RandomForestClassifier {
    /// Create an unfitted classifier.
    #[must_use]
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            schema: None,
            pool: None,
        }
    }

    /// Return the cached pool of `n_jobs` threads, building it if needed.
    fn worker_pool(&mut self, n_jobs: usize) -> Result<Arc<rayon::ThreadPool>, RfError> {
        if let Some(pool) = &self.pool
            && pool.current_num_threads() == n_jobs
        {
            return Ok(Arc::clone(pool));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_jobs)
            .build()
            .map(Arc::new)
            .map_err(|source| RfError::ThreadPool { n_jobs, source })?;
        debug!(n_jobs, "worker pool built");
        self.pool = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Return the hyperparameters.
    #[must_use]
    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    /// Change the target number of trees for the next [`fit`](Self::fit).
    pub fn set_n_estimators(&mut self, n_estimators: usize) {
        self.config.n_estimators = n_estimators;
    }

    /// Return the number of trees currently in the ensemble.
    #[must_use]
    pub fn n_trained(&self) -> usize {
        self.trees.len()
    }

    /// Return the trained trees.
    #[must_use]
    pub fn estimators(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the sorted class labels per output; empty before the first fit.
    #[must_use]
    pub fn classes(&self) -> &[Vec<i64>] {
        self.schema
            .as_ref()
            .map(|s| s.classes.as_slice())
            .unwrap_or_default()
    }

    /// Return the number of features seen during fit; 0 before the first fit.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.schema.as_ref().map_or(0, |s| s.n_features)
    }

    /// Return the number of outputs seen during fit; 0 before the first fit.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.schema.as_ref().map_or(0, |s| s.classes.len())
    }

    /// Fit the forest, or extend it when warm start is enabled.
    ///
    /// `sample_weight` defaults to 1.0 per sample. Samples with zero weight
    /// never reach a tree.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                               |
    /// |---------------------------------------|----------------------------------------------------|
    /// | [`RfError::EmptyDataset`]             | `x` has no rows                                    |
    /// | [`RfError::ZeroFeatures`]             | rows have zero feature columns                     |
    /// | [`RfError::FeatureCountMismatch`]     | rows have inconsistent lengths                     |
    /// | [`RfError::NonFiniteValue`]           | any value is NaN or infinite                       |
    /// | [`RfError::LabelCountMismatch`]       | `y` and `x` differ in row count                    |
    /// | [`RfError::OutputCountMismatch`]      | multi-output label rows are ragged                 |
    /// | [`RfError::SampleWeightMismatch`]     | weight count differs from row count                |
    /// | [`RfError::InvalidSampleWeight`]      | a weight is negative or non-finite                 |
    /// | [`RfError::ZeroTotalWeight`]          | all weights are zero                               |
    /// | [`RfError::InvalidTreeCount`]         | `n_estimators` is zero                             |
    /// | [`RfError::InvalidWarmStart`]         | warm start with fewer estimators than trained      |
    /// | [`RfError::TrainingDataChanged`]      | warm start on data with a different layout         |
    /// | [`RfError::ThreadPool`]               | the dedicated `n_jobs` pool cannot be built        |
    ///
    /// Hyperparameter errors from [`RandomForestConfig::validate`] propagate too.
    #[instrument(skip_all, fields(n_estimators = self.config.n_estimators, n_samples = x.n_rows()))]
    pub fn fit(
        &mut self,
        x: &FeatureMatrix,
        y: &Targets,
        sample_weight: Option<&[f64]>,
    ) -> Result<&mut Self, RfError> {
        let data = TrainingData::prepare(x, y)?;
        let weights = resolve_sample_weights(sample_weight, data.n_samples)?;
        let max_features = self.config.validate(data.n_features)?;
        let n_estimators = self.config.n_estimators;
        if n_estimators == 0 {
            return Err(RfError::InvalidTreeCount {
                n_trees: n_estimators,
            });
        }

        let schema = TrainingSchema::of(&data);
        if !self.config.warm_start || self.trees.is_empty() {
            self.trees.clear();
        } else {
            if let Some(previous) = &self.schema
                && let Some(reason) = previous.mismatch(&schema)
            {
                return Err(RfError::TrainingDataChanged { reason });
            }
            let n_trained = self.trees.len();
            if n_estimators < n_trained {
                return Err(RfError::InvalidWarmStart {
                    n_estimators,
                    n_trained,
                });
            }
            if n_estimators == n_trained {
                warn!(n_trained, "warm start without more estimators trains no new trees");
                return Ok(self);
            }
        }

        let start = self.trees.len();
        info!(
            n_new = n_estimators - start,
            n_features = data.n_features,
            n_outputs = schema.classes.len(),
            max_features,
            "training random forest"
        );

        let tree_config = self.config.tree_config();
        let seed = self.config.seed;
        let bootstrap = self.config.bootstrap;
        let train_one = |index: usize| -> DecisionTree {
            let mut rng = ChaCha8Rng::seed_from_u64(tree_seed(seed, index));
            let tree_weights = if bootstrap {
                bootstrap_weights(&weights, &mut rng)
            } else {
                weights.clone()
            };
            tree_config
                .clone()
                .with_seed(rng.r#gen())
                .grow(&data, &tree_weights, max_features)
        };

        let new_trees: Vec<DecisionTree> = match self.config.n_jobs {
            Some(n_jobs) => {
                let pool = self.worker_pool(n_jobs)?;
                pool.install(|| (start..n_estimators).into_par_iter().map(train_one).collect())
            }
            None => (start..n_estimators).into_par_iter().map(train_one).collect(),
        };

        self.trees.extend(new_trees);
        self.schema = Some(schema);
        debug!(n_trained = self.trees.len(), "tree training complete");
        Ok(self)
    }

    /// Compute Mean Decrease in Impurity importances averaged over all trees.
    ///
    /// Normalized to sum to 1.0 unless every tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features()];
        for tree in &self.trees {
            for (total, imp) in totals.iter_mut().zip(tree.feature_importances()) {
                *total += imp;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }
}
