//! Static capability metadata an outer search system filters algorithms by.

use serde::{Deserialize, Serialize};

/// Input layouts an algorithm accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLayout {
    /// Row-major dense matrices.
    Dense,
    /// Compressed sparse rows.
    Sparse,
}

/// What an algorithm produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Class predictions.
    Predictions,
}

/// Element type the algorithm prefers to receive. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    /// 32-bit floats.
    Float32,
    /// 64-bit floats.
    Float64,
}

/// Capability flags and identity of a classification algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    /// Human-readable algorithm name.
    pub name: String,
    /// Abbreviation used in reports.
    pub short_name: String,
    /// Accepted input layouts.
    pub input: Vec<DataLayout>,
    /// Kind of output produced.
    pub output: OutputKind,
    /// Accepts missing feature values.
    pub handles_missing_values: bool,
    /// Accepts nominal (categorical) features.
    pub handles_nominal_values: bool,
    /// Accepts numerical features.
    pub handles_numerical_features: bool,
    /// Benefits from feature scaling.
    pub prefers_data_scaled: bool,
    /// Benefits from feature normalization.
    pub prefers_data_normalized: bool,
    /// Supports regression targets.
    pub handles_regression: bool,
    /// Supports classification targets.
    pub handles_classification: bool,
    /// Supports more than two classes.
    pub handles_multiclass: bool,
    /// Supports several label columns at once.
    pub handles_multilabel: bool,
    /// Same seed and data give the same model.
    pub is_deterministic: bool,
    /// Accepts sparse input without densifying.
    pub handles_sparse: bool,
    /// Preferred element type of the input.
    pub preferred_dtype: Dtype,
}
