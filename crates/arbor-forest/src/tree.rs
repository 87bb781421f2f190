use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::{
    RfError,
    matrix::FeatureMatrix,
    node::{Node, NodeIndex},
    split::{ClassWeights, SplitContext, SplitCriterion, SplitResult, find_best_split},
    target::{EncodedTargets, Targets, argmax},
};

/// Validated training data in the layout the tree builder consumes.
#[derive(Debug)]
pub(crate) struct TrainingData {
    /// `columns[feature_idx][sample_idx]`.
    pub(crate) columns: Vec<Vec<f64>>,
    pub(crate) targets: EncodedTargets,
    pub(crate) n_samples: usize,
    pub(crate) n_features: usize,
}

impl TrainingData {
    pub(crate) fn prepare(x: &FeatureMatrix, y: &Targets) -> Result<Self, RfError> {
        let (n_samples, n_features) = x.validate()?;
        let targets = y.encode(n_samples)?;
        Ok(Self {
            columns: x.to_columns(),
            targets,
            n_samples,
            n_features,
        })
    }
}

/// Check caller-supplied weights, defaulting to 1.0 per sample.
pub(crate) fn resolve_sample_weights(
    sample_weight: Option<&[f64]>,
    n_samples: usize,
) -> Result<Vec<f64>, RfError> {
    let Some(weights) = sample_weight else {
        return Ok(vec![1.0; n_samples]);
    };
    if weights.len() != n_samples {
        return Err(RfError::SampleWeightMismatch {
            n_samples,
            n_weights: weights.len(),
        });
    }
    if let Some((sample_index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(RfError::InvalidSampleWeight {
            sample_index,
            weight,
        });
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(RfError::ZeroTotalWeight);
    }
    Ok(weights.to_vec())
}

/// Configuration for a single CART decision tree.
///
/// # Defaults
///
/// | Parameter                  | Default               |
/// |----------------------------|-----------------------|
/// | `criterion`                | `Gini`                |
/// | `max_depth`                | `None` (unlimited)    |
/// | `min_samples_split`        | 2                     |
/// | `min_samples_leaf`         | 1                     |
/// | `min_weight_fraction_leaf` | 0.0                   |
/// | `max_leaf_nodes`           | `None` (depth-first)  |
/// | `seed`                     | 42                    |
#[derive(Debug, Clone)]
pub(crate) struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_weight_fraction_leaf: f64,
    pub(crate) max_leaf_nodes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    pub(crate) fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_weight_fraction_leaf: 0.0,
            max_leaf_nodes: None,
            seed: 42,
        }
    }

    #[must_use]
    pub(crate) fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Grow a tree over the samples with positive weight.
    ///
    /// Inputs and hyperparameters are validated by the caller, so growth
    /// itself cannot fail.
    pub(crate) fn grow(
        &self,
        data: &TrainingData,
        weights: &[f64],
        max_features: usize,
    ) -> DecisionTree {
        let n_classes = data.targets.n_classes();
        let total_weight: f64 = weights.iter().sum();
        let sample_indices: Vec<usize> =
            (0..data.n_samples).filter(|&i| weights[i] > 0.0).collect();

        let mut builder = TreeBuilder {
            ctx: SplitContext {
                columns: &data.columns,
                codes: &data.targets.codes,
                weights,
                n_classes: &n_classes,
                criterion: self.criterion,
                max_features,
                min_samples_leaf: self.min_samples_leaf,
                min_weight_leaf: self.min_weight_fraction_leaf * total_weight,
            },
            config: self,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };

        match self.max_leaf_nodes {
            Some(max_leaf_nodes) => builder.build_best_first(&sample_indices, max_leaf_nodes),
            None => {
                builder.build_depth_first(&sample_indices, 0);
            }
        }

        trace!(
            n_nodes = builder.arena.len(),
            n_samples = sample_indices.len(),
            "decision tree grown"
        );

        DecisionTree {
            nodes: builder.arena,
            n_features: data.n_features,
            n_classes,
        }
    }
}

/// A split waiting to be applied during best-first growth.
struct Frontier {
    node: NodeIndex,
    depth: usize,
    split: SplitResult,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Largest decrease first; among equals, the node created earlier.
    fn cmp(&self, other: &Self) -> Ordering {
        self.split
            .impurity_decrease
            .total_cmp(&other.split.impurity_decrease)
            .then_with(|| other.node.cmp(&self.node))
    }
}

struct TreeBuilder<'a> {
    ctx: SplitContext<'a>,
    config: &'a DecisionTreeConfig,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn push_leaf(&mut self, stats: &ClassWeights, n_samples: usize) -> NodeIndex {
        let distribution: Vec<Vec<f64>> = stats
            .per_output
            .iter()
            .map(|counts| {
                if stats.total > 0.0 {
                    counts.iter().map(|&w| w / stats.total).collect()
                } else {
                    vec![1.0 / counts.len() as f64; counts.len()]
                }
            })
            .collect();
        let prediction = distribution.iter().map(|d| argmax(d)).collect();
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity: stats.impurity(self.ctx.criterion),
            n_samples,
            weighted_n_samples: stats.total,
        });
        NodeIndex::new(idx)
    }

    /// Apply the stopping rules, then search for a split.
    fn candidate_split(
        &mut self,
        indices: &[usize],
        stats: &ClassWeights,
        depth: usize,
    ) -> Option<SplitResult> {
        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = indices.len() < self.config.min_samples_split
            || stats.total < 2.0 * self.ctx.min_weight_leaf;
        let pure = stats.impurity(self.ctx.criterion).value() <= f64::EPSILON;
        if depth_exceeded || too_few || pure {
            return None;
        }
        find_best_split(&self.ctx, indices, stats, &mut self.rng)
    }

    fn stats(&self, indices: &[usize]) -> ClassWeights {
        ClassWeights::collect(self.ctx.n_classes, self.ctx.codes, self.ctx.weights, indices)
    }

    /// Turn the leaf at `node` into a split over its two children.
    fn attach_split(&mut self, node: NodeIndex, split: &SplitResult, left: NodeIndex, right: NodeIndex) {
        let old = &self.arena[node.index()];
        let replacement = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity: old.impurity(),
            n_samples: old.n_samples(),
            weighted_n_samples: old.weighted_n_samples(),
            impurity_decrease: split.impurity_decrease,
        };
        self.arena[node.index()] = replacement;
    }

    fn build_depth_first(&mut self, indices: &[usize], depth: usize) -> NodeIndex {
        let stats = self.stats(indices);
        // The node starts as a leaf and is overwritten if a split is found.
        let node = self.push_leaf(&stats, indices.len());
        let Some(split) = self.candidate_split(indices, &stats, depth) else {
            return node;
        };
        let left = self.build_depth_first(&split.left_indices, depth + 1);
        let right = self.build_depth_first(&split.right_indices, depth + 1);
        self.attach_split(node, &split, left, right);
        node
    }

    /// Expand the frontier node with the largest impurity decrease until
    /// `max_leaf_nodes` leaves exist or nothing is left to split.
    fn build_best_first(&mut self, indices: &[usize], max_leaf_nodes: usize) {
        let mut heap = BinaryHeap::new();
        self.push_frontier(indices, 0, &mut heap);

        let mut n_leaves = 1;
        while n_leaves < max_leaf_nodes {
            let Some(Frontier { node, depth, split }) = heap.pop() else {
                break;
            };
            let left = self.push_frontier(&split.left_indices, depth + 1, &mut heap);
            let right = self.push_frontier(&split.right_indices, depth + 1, &mut heap);
            self.attach_split(node, &split, left, right);
            n_leaves += 1;
        }
    }

    fn push_frontier(
        &mut self,
        indices: &[usize],
        depth: usize,
        heap: &mut BinaryHeap<Frontier>,
    ) -> NodeIndex {
        let stats = self.stats(indices);
        let node = self.push_leaf(&stats, indices.len());
        if let Some(split) = self.candidate_split(indices, &stats, depth) {
            heap.push(Frontier { node, depth, split });
        }
        node
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; leaves hold
/// one class distribution per output.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: Vec<usize>,
}

impl DecisionTree {
    /// Predict the class index of every output for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<Vec<usize>, RfError> {
        self.check_width(sample)?;
        match &self.nodes[self.traverse(sample)] {
            Node::Leaf { prediction, .. } => Ok(prediction.clone()),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the class distribution of every output for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[Vec<f64>], RfError> {
        self.check_width(sample)?;
        Ok(self.leaf_distribution(sample))
    }

    pub(crate) fn leaf_distribution(&self, sample: &[f64]) -> &[Vec<f64>] {
        match &self.nodes[self.traverse(sample)] {
            Node::Leaf { distribution, .. } => distribution,
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Compute Mean Decrease in Impurity (MDI) feature importances.
    ///
    /// All zeros when the tree is a single leaf; otherwise sums to 1.0.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease.max(0.0);
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the nodes in arena order (root first).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the maximum depth of the tree; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(NodeIndex::new(0), 0)];
        while let Some((slot, depth)) = pending.pop() {
            match self.nodes[slot.index()].children() {
                Some((left, right)) => pending.extend([(left, depth + 1), (right, depth + 1)]),
                None => deepest = deepest.max(depth),
            }
        }
        deepest
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grow(
        config: &DecisionTreeConfig,
        rows: Vec<Vec<f64>>,
        labels: Vec<i64>,
        weights: Option<Vec<f64>>,
    ) -> DecisionTree {
        let data =
            TrainingData::prepare(&FeatureMatrix::Dense(rows), &Targets::Single(labels)).unwrap();
        let weights = resolve_sample_weights(weights.as_deref(), data.n_samples).unwrap();
        config.grow(&data, &weights, data.n_features)
    }

    fn separable() -> (Vec<Vec<f64>>, Vec<i64>) {
        let rows = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (rows, vec![0, 0, 0, 1, 1, 1])
    }

    fn xor() -> (Vec<Vec<f64>>, Vec<i64>) {
        let rows = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        (rows, vec![0, 1, 1, 0])
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = grow(&DecisionTreeConfig::new(), rows, vec![4, 4, 4], None);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), vec![0]);
    }

    #[test]
    fn linearly_separable_correct_split() {
        let (rows, labels) = separable();
        let tree = grow(&DecisionTreeConfig::new(), rows, labels, None);
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), vec![0]);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), vec![1]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn xor_needs_depth_at_least_2() {
        let (rows, labels) = xor();
        let tree = grow(&DecisionTreeConfig::new(), rows, labels, None);
        assert!(tree.depth() >= 2);
    }

    #[test]
    fn max_depth_limits_tree() {
        let (rows, labels) = xor();
        let config = DecisionTreeConfig {
            max_depth: Some(1),
            ..DecisionTreeConfig::new()
        };
        let tree = grow(&config, rows, labels, None);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn max_leaf_nodes_caps_leaves() {
        let rows: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let labels: Vec<i64> = (0..16).map(|i| i % 4).collect();
        let config = DecisionTreeConfig {
            max_leaf_nodes: Some(3),
            ..DecisionTreeConfig::new()
        };
        let tree = grow(&config, rows, labels, None);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.n_nodes(), 5);
    }

    #[test]
    fn best_first_with_room_matches_full_growth() {
        let (rows, labels) = separable();
        let config = DecisionTreeConfig {
            max_leaf_nodes: Some(64),
            ..DecisionTreeConfig::new()
        };
        let tree = grow(&config, rows, labels, None);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn zero_weight_samples_are_ignored() {
        // The two mislabeled samples carry no weight.
        let rows = vec![vec![1.0], vec![2.0], vec![3.0], vec![10.0], vec![11.0], vec![12.0]];
        let labels = vec![0, 1, 0, 1, 0, 1];
        let weights = vec![1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let tree = grow(&DecisionTreeConfig::new(), rows, labels, Some(weights));
        assert_eq!(tree.predict(&[2.0]).unwrap(), vec![0]);
        assert_eq!(tree.predict(&[11.0]).unwrap(), vec![1]);
        assert_eq!(tree.nodes()[0].n_samples(), 4);
    }

    #[test]
    fn min_weight_fraction_leaf_blocks_small_leaves() {
        let (rows, labels) = separable();
        let config = DecisionTreeConfig {
            min_weight_fraction_leaf: 0.5,
            ..DecisionTreeConfig::new()
        };
        let tree = grow(&config, rows, labels, None);
        // Only the 3 | 3 split leaves half of the weight on each side.
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn multi_output_leaves_carry_each_output() {
        let rows = vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]];
        let y = Targets::Multi(vec![vec![0, 5], vec![0, 5], vec![1, 7], vec![1, 7]]);
        let data = TrainingData::prepare(&FeatureMatrix::Dense(rows), &y).unwrap();
        let weights = resolve_sample_weights(None, 4).unwrap();
        let tree = DecisionTreeConfig::new().grow(&data, &weights, 1);
        assert_eq!(tree.predict(&[0.5]).unwrap(), vec![0, 0]);
        assert_eq!(tree.predict(&[10.5]).unwrap(), vec![1, 1]);
        assert_eq!(tree.predict_proba(&[0.5]).unwrap().len(), 2);
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let rows = vec![
            vec![1.0, 100.0],
            vec![2.0, 200.0],
            vec![3.0, 300.0],
            vec![10.0, 100.0],
            vec![11.0, 200.0],
            vec![12.0, 300.0],
        ];
        let tree = grow(&DecisionTreeConfig::new(), rows, vec![0, 0, 0, 1, 1, 1], None);
        let sum: f64 = tree.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-10, "sum = {sum}");
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (rows, labels) = xor();
        let config = DecisionTreeConfig::new().with_seed(123);
        let a = grow(&config, rows.clone(), labels.clone(), None);
        let b = grow(&config, rows, labels, None);
        assert_eq!(a, b);
    }

    #[test]
    fn prediction_feature_mismatch() {
        let (rows, labels) = separable();
        let tree = grow(&DecisionTreeConfig::new(), rows, labels, None);
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn sample_weight_validation() {
        assert!(matches!(
            resolve_sample_weights(Some(&[1.0]), 2).unwrap_err(),
            RfError::SampleWeightMismatch { n_samples: 2, n_weights: 1 }
        ));
        assert!(matches!(
            resolve_sample_weights(Some(&[1.0, -0.5]), 2).unwrap_err(),
            RfError::InvalidSampleWeight { sample_index: 1, .. }
        ));
        assert!(matches!(
            resolve_sample_weights(Some(&[0.0, 0.0]), 2).unwrap_err(),
            RfError::ZeroTotalWeight
        ));
    }
}
