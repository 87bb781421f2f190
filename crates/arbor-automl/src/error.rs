use arbor_forest::RfError;
use arbor_space::Value;

/// Errors from the classifier adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Returned when predicting before the first incremental fit.
    #[error("classifier has not been fitted")]
    NotFitted,

    /// Returned when the forest engine rejects the inputs or configuration.
    #[error(transparent)]
    Engine(#[from] RfError),

    /// Returned when a raw hyperparameter value cannot be coerced.
    #[error("hyperparameter '{name}' has value {value}, expected {expected}")]
    Conversion {
        /// Hyperparameter name.
        name: &'static str,
        /// The raw value received.
        value: Value,
        /// Description of what was accepted.
        expected: &'static str,
    },

    /// Returned when a configuration lacks a recognized hyperparameter.
    #[error("configuration is missing hyperparameter '{name}'")]
    MissingHyperparameter {
        /// Hyperparameter name.
        name: &'static str,
    },

    /// Returned when `iterative_fit` is asked to add zero trees.
    #[error("increment must be at least 1")]
    InvalidIncrement,
}
