//! Class targets, class encoding, and probability outputs.

use serde::{Deserialize, Serialize};

use crate::error::RfError;

/// Class labels aligned row-wise with a [`FeatureMatrix`](crate::FeatureMatrix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Targets {
    /// One label per sample.
    Single(Vec<i64>),
    /// Several labels per sample: `rows[sample_idx][output_idx]`.
    Multi(Vec<Vec<i64>>),
}

impl Targets {
    /// Return the number of label rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            Targets::Single(labels) => labels.len(),
            Targets::Multi(rows) => rows.len(),
        }
    }

    /// Return the number of outputs per sample.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        match self {
            Targets::Single(_) => 1,
            Targets::Multi(rows) => rows.first().map_or(0, Vec::len),
        }
    }

    /// Return the labels of a single-output target.
    #[must_use]
    pub fn as_single(&self) -> Option<&[i64]> {
        match self {
            Targets::Single(labels) => Some(labels),
            Targets::Multi(_) => None,
        }
    }

    /// Return the label column for one output.
    #[must_use]
    pub fn column(&self, output: usize) -> Vec<i64> {
        match self {
            Targets::Single(labels) => labels.clone(),
            Targets::Multi(rows) => rows.iter().map(|row| row[output]).collect(),
        }
    }

    /// Check the label layout and map every output onto `0..n_classes`.
    pub(crate) fn encode(&self, n_samples: usize) -> Result<EncodedTargets, RfError> {
        if self.n_rows() != n_samples {
            return Err(RfError::LabelCountMismatch {
                n_samples,
                n_labels: self.n_rows(),
            });
        }
        let n_outputs = self.n_outputs();
        if let Targets::Multi(rows) = self {
            for (sample_index, row) in rows.iter().enumerate() {
                if row.len() != n_outputs || row.is_empty() {
                    return Err(RfError::OutputCountMismatch {
                        sample_index,
                        expected: n_outputs,
                        got: row.len(),
                    });
                }
            }
        }

        let mut classes = Vec::with_capacity(n_outputs);
        let mut codes = Vec::with_capacity(n_outputs);
        for output in 0..n_outputs {
            let column = self.column(output);
            let mut distinct = column.clone();
            distinct.sort_unstable();
            distinct.dedup();
            let encoded = column
                .iter()
                .map(|label| distinct.binary_search(label).unwrap_or_default())
                .collect();
            classes.push(distinct);
            codes.push(encoded);
        }

        Ok(EncodedTargets {
            classes,
            codes,
            multi_output: matches!(self, Targets::Multi(_)),
        })
    }
}

impl From<Vec<i64>> for Targets {
    fn from(labels: Vec<i64>) -> Self {
        Targets::Single(labels)
    }
}

/// Labels re-coded as class indices, one column per output.
#[derive(Debug, Clone)]
pub(crate) struct EncodedTargets {
    /// Sorted distinct labels per output.
    pub(crate) classes: Vec<Vec<i64>>,
    /// `codes[output][sample]` indexes into `classes[output]`.
    pub(crate) codes: Vec<Vec<usize>>,
    pub(crate) multi_output: bool,
}

impl EncodedTargets {
    pub(crate) fn n_classes(&self) -> Vec<usize> {
        self.classes.iter().map(Vec::len).collect()
    }
}

/// Class probability distributions produced by `predict_proba`.
///
/// Columns follow the sorted class list of the corresponding output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Probabilities {
    /// `rows[sample_idx][class_idx]`.
    Single(Vec<Vec<f64>>),
    /// `outputs[output_idx][sample_idx][class_idx]`.
    Multi(Vec<Vec<Vec<f64>>>),
}

impl Probabilities {
    /// Return the per-row distributions of a single-output prediction.
    #[must_use]
    pub fn as_single(&self) -> Option<&[Vec<f64>]> {
        match self {
            Probabilities::Single(rows) => Some(rows),
            Probabilities::Multi(_) => None,
        }
    }

    /// Return the number of predicted rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            Probabilities::Single(rows) => rows.len(),
            Probabilities::Multi(outputs) => outputs.first().map_or(0, Vec::len),
        }
    }
}

/// Index of the largest probability; the first one wins ties.
pub(crate) fn argmax(probs: &[f64]) -> usize {
    probs
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (idx, &p)| {
            if p > best.1 { (idx, p) } else { best }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_sorts_classes() {
        let y = Targets::Single(vec![7, -1, 7, 3]);
        let enc = y.encode(4).unwrap();
        assert_eq!(enc.classes, vec![vec![-1, 3, 7]]);
        assert_eq!(enc.codes, vec![vec![2, 0, 2, 1]]);
        assert!(!enc.multi_output);
    }

    #[test]
    fn encode_multi_output_per_column() {
        let y = Targets::Multi(vec![vec![0, 1], vec![1, 1], vec![0, 0]]);
        let enc = y.encode(3).unwrap();
        assert_eq!(enc.n_classes(), vec![2, 2]);
        assert_eq!(enc.codes[0], vec![0, 1, 0]);
        assert!(enc.multi_output);
    }

    #[test]
    fn encode_rejects_ragged_outputs() {
        let y = Targets::Multi(vec![vec![0, 1], vec![1]]);
        let err = y.encode(2).unwrap_err();
        assert!(matches!(err, RfError::OutputCountMismatch { sample_index: 1, .. }));
    }

    #[test]
    fn encode_rejects_length_mismatch() {
        let err = Targets::Single(vec![0, 1]).encode(3).unwrap_err();
        assert!(matches!(
            err,
            RfError::LabelCountMismatch { n_samples: 3, n_labels: 2 }
        ));
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.25, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[1.0]), 0);
    }
}
