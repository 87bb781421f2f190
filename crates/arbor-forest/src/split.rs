use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class totals.
    ///
    /// Returns [`Impurity::new(0.0)`] when `total` is not positive.
    ///
    /// For `Gini`: `1 - Σ(p_i²)` where `p_i = weight_i / total`.
    /// For `Entropy`: `-Σ(p_i · ln(p_i))` summed only over classes where `p_i > 0`.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total: f64) -> Impurity {
        if total <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_weights
                    .iter()
                    .filter(|&&w| w > 0.0)
                    .map(|&w| {
                        let p = w / total;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value.max(0.0))
    }
}

/// Weighted class totals of a sample set, one row per output.
#[derive(Debug, Clone)]
pub(crate) struct ClassWeights {
    pub(crate) per_output: Vec<Vec<f64>>,
    pub(crate) total: f64,
}

impl ClassWeights {
    pub(crate) fn zeros(n_classes: &[usize]) -> Self {
        Self {
            per_output: n_classes.iter().map(|&k| vec![0.0; k]).collect(),
            total: 0.0,
        }
    }

    /// Accumulate the totals of `sample_indices`.
    pub(crate) fn collect(
        n_classes: &[usize],
        codes: &[Vec<usize>],
        weights: &[f64],
        sample_indices: &[usize],
    ) -> Self {
        let mut out = Self::zeros(n_classes);
        for &si in sample_indices {
            out.add(codes, si, weights[si]);
        }
        out
    }

    fn add(&mut self, codes: &[Vec<usize>], sample: usize, weight: f64) {
        for (output, counts) in self.per_output.iter_mut().enumerate() {
            counts[codes[output][sample]] += weight;
        }
        self.total += weight;
    }

    fn remove(&mut self, codes: &[Vec<usize>], sample: usize, weight: f64) {
        for (output, counts) in self.per_output.iter_mut().enumerate() {
            counts[codes[output][sample]] -= weight;
        }
        self.total -= weight;
    }

    /// Mean impurity over outputs.
    pub(crate) fn impurity(&self, criterion: SplitCriterion) -> Impurity {
        let n_outputs = self.per_output.len().max(1) as f64;
        let sum: f64 = self
            .per_output
            .iter()
            .map(|counts| criterion.impurity(counts, self.total).value())
            .sum();
        Impurity::new(sum / n_outputs)
    }
}

/// Training data and constraints shared by every split search in one tree.
pub(crate) struct SplitContext<'a> {
    /// Column-major features: `columns[feature_idx][sample_idx]`.
    pub(crate) columns: &'a [Vec<f64>],
    /// Encoded labels: `codes[output_idx][sample_idx]`.
    pub(crate) codes: &'a [Vec<usize>],
    pub(crate) weights: &'a [f64],
    pub(crate) n_classes: &'a [usize],
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_weight_leaf: f64,
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Weighted impurity decrease (MDI numerator).
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split among a random subset of `max_features` features.
///
/// For each candidate feature, sorts the node's samples by value and scans
/// left-to-right, moving weighted class totals from the right child to the
/// left one. Returns `None` when no boundary satisfies both
/// `min_samples_leaf` and `min_weight_leaf`.
pub(crate) fn find_best_split(
    ctx: &SplitContext<'_>,
    sample_indices: &[usize],
    parent: &ClassWeights,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = ctx.columns.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent_impurity = parent.impurity(ctx.criterion).value();

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = ctx.max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &ctx.columns[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        if sorted[0].0 == sorted[n_samples - 1].0 {
            continue;
        }

        let mut left = ClassWeights::zeros(ctx.n_classes);
        let mut right = parent.clone();

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let w = ctx.weights[si];
            left.add(ctx.codes, si, w);
            right.remove(ctx.codes, si, w);

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < ctx.min_samples_leaf || n_right < ctx.min_samples_leaf {
                continue;
            }
            if left.total < ctx.min_weight_leaf || right.total < ctx.min_weight_leaf {
                continue;
            }

            let decrease = parent.total * parent_impurity
                - left.total * left.impurity(ctx.criterion).value()
                - right.total * right.impurity(ctx.criterion).value();

            if decrease > best_decrease {
                best_decrease = decrease;
                let mut threshold = (val_i + val_next) / 2.0;
                // Midpoint can round up to the next value.
                if threshold >= val_next {
                    threshold = val_i;
                }
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &ctx.columns[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn context<'a>(
        columns: &'a [Vec<f64>],
        codes: &'a [Vec<usize>],
        weights: &'a [f64],
        n_classes: &'a [usize],
        min_samples_leaf: usize,
        min_weight_leaf: f64,
    ) -> SplitContext<'a> {
        SplitContext {
            columns,
            codes,
            weights,
            n_classes,
            criterion: SplitCriterion::Gini,
            max_features: columns.len(),
            min_samples_leaf,
            min_weight_leaf,
        }
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5.0, 5.0], 10.0);
        assert!((imp.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[2.5, 2.5], 5.0);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn impurity_of_empty_node_is_zero() {
        let imp = SplitCriterion::Entropy.impurity(&[0.0, 0.0], 0.0);
        assert_eq!(imp.value(), 0.0);
    }

    #[test]
    fn multi_output_impurity_is_averaged() {
        // Output 0 pure, output 1 balanced.
        let codes = vec![vec![0, 0], vec![0, 1]];
        let weights = vec![1.0, 1.0];
        let cw = ClassWeights::collect(&[1, 2], &codes, &weights, &[0, 1]);
        assert!((cw.impurity(SplitCriterion::Gini).value() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn separable_data_finds_correct_split() {
        let columns = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let codes = vec![vec![0, 0, 0, 1, 1, 1]];
        let weights = vec![1.0; 6];
        let n_classes = [2];
        let ctx = context(&columns, &codes, &weights, &n_classes, 1, 0.0);
        let indices: Vec<usize> = (0..6).collect();
        let parent = ClassWeights::collect(&n_classes, &codes, &weights, &indices);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&ctx, &indices, &parent, &mut rng).expect("should split");
        assert_eq!(split.feature.index(), 0);
        assert!(split.threshold > 3.0 && split.threshold < 10.0);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn weights_move_the_threshold() {
        // Unweighted, both boundaries tie and the first (1.5) wins; the heavy
        // third sample makes isolating it the better split.
        let columns = vec![vec![1.0, 2.0, 3.0]];
        let codes = vec![vec![0, 1, 0]];
        let n_classes = [2];
        let weights = vec![1.0, 1.0, 10.0];
        let ctx = context(&columns, &codes, &weights, &n_classes, 1, 0.0);
        let indices: Vec<usize> = (0..3).collect();
        let parent = ClassWeights::collect(&n_classes, &codes, &weights, &indices);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let split = find_best_split(&ctx, &indices, &parent, &mut rng).unwrap();
        assert!(split.threshold > 2.0 && split.threshold < 3.0);
    }

    #[test]
    fn constant_feature_returns_none() {
        let columns = vec![vec![5.0, 5.0, 5.0, 5.0]];
        let codes = vec![vec![0, 0, 1, 1]];
        let weights = vec![1.0; 4];
        let n_classes = [2];
        let ctx = context(&columns, &codes, &weights, &n_classes, 1, 0.0);
        let indices: Vec<usize> = (0..4).collect();
        let parent = ClassWeights::collect(&n_classes, &codes, &weights, &indices);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(find_best_split(&ctx, &indices, &parent, &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let columns = vec![vec![1.0, 10.0]];
        let codes = vec![vec![0, 1]];
        let weights = vec![1.0; 2];
        let n_classes = [2];
        let ctx = context(&columns, &codes, &weights, &n_classes, 2, 0.0);
        let indices: Vec<usize> = (0..2).collect();
        let parent = ClassWeights::collect(&n_classes, &codes, &weights, &indices);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(find_best_split(&ctx, &indices, &parent, &mut rng).is_none());
    }

    #[test]
    fn min_weight_leaf_enforced() {
        let columns = vec![vec![1.0, 2.0, 3.0]];
        let codes = vec![vec![0, 1, 1]];
        let weights = vec![0.5, 1.0, 1.0];
        let n_classes = [2];
        // Only the split {0} | {1, 2} separates classes, but its left weight is 0.5.
        let ctx = context(&columns, &codes, &weights, &n_classes, 1, 0.75);
        let indices: Vec<usize> = (0..3).collect();
        let parent = ClassWeights::collect(&n_classes, &codes, &weights, &indices);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&ctx, &indices, &parent, &mut rng).unwrap();
        assert_eq!(split.left_indices, vec![0, 1]);
    }
}
