//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::{RandomForestClassifier, TrainingSchema};
use crate::matrix::FeatureMatrix;
use crate::target::{Probabilities, Targets, argmax};

impl RandomForestClassifier {
    /// Predict class labels for every row of `x`.
    ///
    /// Each output takes the argmax of the averaged distribution; the
    /// returned [`Targets`] has the arity of the training labels.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                  |
    /// |-----------------------------------------|---------------------------------------|
    /// | [`RfError::NotFitted`]                  | the forest holds no trees             |
    /// | [`RfError::PredictionFeatureMismatch`]  | a row has the wrong feature count     |
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Targets, RfError> {
        let schema = self.fitted_schema()?;
        let rows = self.averaged_distributions(x)?;
        let labels: Vec<Vec<i64>> = rows
            .iter()
            .map(|outputs| {
                outputs
                    .iter()
                    .zip(&schema.classes)
                    .map(|(dist, classes)| classes[argmax(dist)])
                    .collect()
            })
            .collect();
        if schema.multi_output {
            Ok(Targets::Multi(labels))
        } else {
            Ok(Targets::Single(labels.into_iter().map(|row| row[0]).collect()))
        }
    }

    /// Return averaged class probabilities for every row of `x`.
    ///
    /// Columns follow [`classes`](Self::classes) for each output.
    ///
    /// # Errors
    ///
    /// Same as [`predict`](Self::predict).
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Probabilities, RfError> {
        let schema = self.fitted_schema()?;
        let rows = self.averaged_distributions(x)?;
        if schema.multi_output {
            let n_outputs = schema.classes.len();
            let mut outputs: Vec<Vec<Vec<f64>>> = vec![Vec::with_capacity(rows.len()); n_outputs];
            for row in rows {
                for (output, dist) in row.into_iter().enumerate() {
                    outputs[output].push(dist);
                }
            }
            Ok(Probabilities::Multi(outputs))
        } else {
            Ok(Probabilities::Single(
                rows.into_iter()
                    .map(|mut row| row.swap_remove(0))
                    .collect(),
            ))
        }
    }

    fn fitted_schema(&self) -> Result<&TrainingSchema, RfError> {
        match &self.schema {
            Some(schema) if !self.trees.is_empty() => Ok(schema),
            _ => Err(RfError::NotFitted),
        }
    }

    /// Average leaf distributions over all trees: `[row][output][class]`.
    fn averaged_distributions(&self, x: &FeatureMatrix) -> Result<Vec<Vec<Vec<f64>>>, RfError> {
        let n_features = self.n_features();
        let n_trees = self.trees.len() as f64;
        (0..x.n_rows())
            .into_par_iter()
            .map(|i| {
                let sample = x.row(i);
                if sample.len() != n_features {
                    return Err(RfError::PredictionFeatureMismatch {
                        expected: n_features,
                        got: sample.len(),
                    });
                }
                let mut avg: Vec<Vec<f64>> = self
                    .classes()
                    .iter()
                    .map(|classes| vec![0.0; classes.len()])
                    .collect();
                for tree in &self.trees {
                    for (acc, dist) in avg.iter_mut().zip(tree.leaf_distribution(&sample)) {
                        for (a, p) in acc.iter_mut().zip(dist) {
                            *a += p;
                        }
                    }
                }
                for acc in &mut avg {
                    acc.iter_mut().for_each(|v| *v /= n_trees);
                }
                Ok(avg)
            })
            .collect()
    }
}
