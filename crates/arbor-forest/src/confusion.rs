//! Held-out scoring: confusion matrix over the forest's class labels.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::RfError;

/// Counts of (true label, predicted label) pairs.
///
/// `as_rows()[t][p]` is the number of rows labeled `classes()[t]` that were
/// predicted as `classes()[p]`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfusionMatrix {
    classes: Vec<i64>,
    counts: Vec<Vec<usize>>,
}

/// Precision, recall and F1 of one class. Undefined ratios are reported as 0.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Rows whose true label is `class`.
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// Tally `true_labels` against `predicted`, with rows and columns in
    /// `classes` order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | no labels |
    /// | [`RfError::LabelCountMismatch`] | the two label slices differ in length |
    /// | [`RfError::UnknownClass`] | a label is missing from `classes` |
    pub fn from_labels(
        true_labels: &[i64],
        predicted: &[i64],
        classes: &[i64],
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }

        let slot: HashMap<i64, usize> = classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let lookup = |label: i64| slot.get(&label).copied().ok_or(RfError::UnknownClass { label });

        let mut counts = vec![vec![0; classes.len()]; classes.len()];
        for (&truth, &guess) in true_labels.iter().zip(predicted) {
            counts[lookup(truth)?][lookup(guess)?] += 1;
        }
        Ok(Self {
            classes: classes.to_vec(),
            counts,
        })
    }

    /// Number of scored rows.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Share of rows on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let hits: usize = self.counts.iter().enumerate().map(|(i, row)| row[i]).sum();
        ratio(hits, self.total())
    }

    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        self.classes
            .iter()
            .enumerate()
            .map(|(c, &class)| {
                let hits = self.counts[c][c];
                let support: usize = self.counts[c].iter().sum();
                let predicted: usize = self.counts.iter().map(|row| row[c]).sum();
                let precision = ratio(hits, predicted);
                let recall = ratio(hits, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics { class, precision, recall, f1, support }
            })
            .collect()
    }

    /// Unweighted mean of the per-class F1 scores.
    #[must_use]
    pub fn macro_f1(&self) -> f64 {
        let metrics = self.class_metrics();
        if metrics.is_empty() {
            return 0.0;
        }
        metrics.iter().map(|m| m.f1).sum::<f64>() / metrics.len() as f64
    }

    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    #[must_use]
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.to_string().len())
            .chain(self.counts.iter().flatten().map(|n| n.to_string().len()))
            .max()
            .unwrap_or(1)
            .max(4);

        write!(f, "{:>width$} |", "true")?;
        for class in &self.classes {
            write!(f, " {class:>width$}")?;
        }
        writeln!(f)?;
        for (class, row) in self.classes.iter().zip(&self.counts) {
            write!(f, "{class:>width$} |")?;
            for n in row {
                write!(f, " {n:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![3, 3, 5, 5, 9, 9];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, &[3, 5, 9]).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);

        for m in cm.class_metrics() {
            assert!((m.precision - 1.0).abs() < f64::EPSILON);
            assert!((m.recall - 1.0).abs() < f64::EPSILON);
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        let true_labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, &[0, 1, 2]).unwrap();

        // Every class: TP=2, FP=1, FN=1.
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
        assert!((cm.macro_f1() - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(cm.total(), 9);
    }

    #[test]
    fn empty_labels_error() {
        let err = ConfusionMatrix::from_labels(&[], &[], &[0, 1]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn unknown_label_error() {
        let err = ConfusionMatrix::from_labels(&[0, 4], &[0, 0], &[0, 1]).unwrap_err();
        assert!(matches!(err, RfError::UnknownClass { label: 4 }));
    }

    #[test]
    fn display_uses_class_labels() {
        let cm = ConfusionMatrix::from_labels(&[-1, 7], &[-1, 7], &[-1, 7]).unwrap();
        let output = format!("{cm}");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "true |   -1    7");
        assert_eq!(lines[2], "   7 |    0    1");
    }

    #[test]
    fn zero_support_class_metrics() {
        let labels = vec![0, 0, 1, 1];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, &[0, 1, 2]).unwrap();
        let metrics = cm.class_metrics();
        assert_eq!(metrics[2].support, 0);
        assert!((metrics[2].recall - 0.0).abs() < f64::EPSILON);
        assert_eq!(cm.as_rows()[0], vec![2, 0, 0]);
    }
}
