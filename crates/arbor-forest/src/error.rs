use std::path::PathBuf;

/// Errors from Random Forest operations.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when a cold fit is requested with zero trees.
    #[error("n_estimators must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid tree count.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when min_weight_fraction_leaf is outside [0.0, 0.5].
    #[error("min_weight_fraction_leaf must be in [0.0, 0.5], got {fraction}")]
    InvalidMinWeightFractionLeaf {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when max_leaf_nodes is below 2.
    #[error("max_leaf_nodes must be at least 2, got {max_leaf_nodes}")]
    InvalidMaxLeafNodes {
        /// The invalid max_leaf_nodes value provided.
        max_leaf_nodes: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when n_jobs is zero.
    #[error("n_jobs must be at least 1, got {n_jobs}")]
    InvalidJobCount {
        /// The invalid worker count.
        n_jobs: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when the label count differs from the sample count.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of label rows.
        n_labels: usize,
    },

    /// Returned when a multi-output label row has the wrong number of outputs.
    #[error("label row {sample_index} has {got} outputs, expected {expected}")]
    OutputCountMismatch {
        /// The zero-based index of the offending label row.
        sample_index: usize,
        /// Outputs in the first label row.
        expected: usize,
        /// Outputs in the offending row.
        got: usize,
    },

    /// Returned when the sample weight count differs from the sample count.
    #[error("got {n_weights} sample weights for {n_samples} samples")]
    SampleWeightMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of weights supplied.
        n_weights: usize,
    },

    /// Returned when a sample weight is negative or non-finite.
    #[error("sample weight {weight} at sample {sample_index} must be finite and non-negative")]
    InvalidSampleWeight {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// Returned when all sample weights are zero.
    #[error("sample weights sum to zero")]
    ZeroTotalWeight,

    /// Returned when CSR components are inconsistent.
    #[error("invalid sparse matrix: {reason}")]
    InvalidSparseMatrix {
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// Returned when a warm-started forest is asked for fewer trees than it holds.
    #[error("n_estimators={n_estimators} must be at least the {n_trained} trees already trained when warm starting")]
    InvalidWarmStart {
        /// The requested tree count.
        n_estimators: usize,
        /// Trees already in the forest.
        n_trained: usize,
    },

    /// Returned when a warm-started forest is refitted on incompatible data.
    #[error("warm start requires the same training layout: {reason}")]
    TrainingDataChanged {
        /// Which property of the training data changed.
        reason: String,
    },

    /// Returned when predicting with a forest that holds no trees.
    #[error("forest has not been fitted")]
    NotFitted,

    /// Returned when a class label is not part of the known class list.
    #[error("unknown class label {label}")]
    UnknownClass {
        /// The unrecognized label.
        label: i64,
    },

    /// Returned when the dedicated worker pool cannot be built.
    #[error("failed to build a pool of {n_jobs} worker threads")]
    ThreadPool {
        /// The requested worker count.
        n_jobs: usize,
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when a decoded model disagrees with its own header.
    #[error("model file {path} is inconsistent: header says {header_trees} trees, body holds {body_trees}")]
    CorruptModel {
        /// Path to the model file.
        path: PathBuf,
        /// Tree count recorded in the envelope header.
        header_trees: usize,
        /// Tree count actually decoded.
        body_trees: usize,
    },
}
