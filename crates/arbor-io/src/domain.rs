//! Domain types for arbor-io.

use arbor_forest::{FeatureMatrix, Targets};

use crate::IoError;

/// Prefix shared by every artifact of one run; only `[a-zA-Z0-9_-]` allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] for an empty name or one
    /// that would not be a safe file name prefix.
    pub fn new(name: String) -> Result<Self, IoError> {
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-');
        if name.is_empty() || !name.chars().all(allowed) {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ExperimentName {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A numeric feature table, optionally carrying one integer label per row.
///
/// Produced by [`LabeledTableReader`](crate::LabeledTableReader). Feature rows
/// and labels are parallel: `labels[i]` belongs to `features[i]`.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Option<Vec<i64>>,
}

impl LabeledDataset {
    pub(crate) fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Option<Vec<i64>>,
    ) -> Self {
        Self { feature_names, features, labels }
    }

    /// Return the feature column names in header order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature rows.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the labels, if a label column was read.
    #[must_use]
    pub fn labels(&self) -> Option<&[i64]> {
        self.labels.as_deref()
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Copy the features into a dense matrix for the forest.
    #[must_use]
    pub fn to_matrix(&self) -> FeatureMatrix {
        FeatureMatrix::Dense(self.features.clone())
    }

    /// Copy the labels into single-output targets.
    #[must_use]
    pub fn targets(&self) -> Option<Targets> {
        self.labels.clone().map(Targets::Single)
    }
}
