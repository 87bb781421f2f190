use crate::value::Value;

/// Errors from building or checking a configuration space.
#[derive(Debug, thiserror::Error)]
pub enum SpaceError {
    /// Returned when a categorical hyperparameter has no choices.
    #[error("categorical hyperparameter '{name}' has no choices")]
    EmptyChoices {
        /// Hyperparameter name.
        name: String,
    },

    /// Returned when a categorical choice appears twice.
    #[error("categorical hyperparameter '{name}' lists choice {choice} twice")]
    DuplicateChoice {
        /// Hyperparameter name.
        name: String,
        /// The repeated choice.
        choice: Value,
    },

    /// Returned when a numeric range has `lower >= upper`.
    #[error("hyperparameter '{name}' needs lower < upper, got [{lower}, {upper}]")]
    InvalidBounds {
        /// Hyperparameter name.
        name: String,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },

    /// Returned when a log-scale range does not start above zero.
    #[error("log-scale hyperparameter '{name}' needs a positive lower bound, got {lower}")]
    NonPositiveLogBound {
        /// Hyperparameter name.
        name: String,
        /// Lower bound.
        lower: f64,
    },

    /// Returned when a default lies outside its hyperparameter's domain.
    #[error("default {default} of hyperparameter '{name}' is outside its domain")]
    DefaultOutOfDomain {
        /// Hyperparameter name.
        name: String,
        /// The rejected default.
        default: Value,
    },

    /// Returned when a space already holds a hyperparameter with this name.
    #[error("hyperparameter '{name}' is already defined")]
    DuplicateHyperparameter {
        /// Hyperparameter name.
        name: String,
    },

    /// Returned when a configuration names a hyperparameter the space lacks.
    #[error("unknown hyperparameter '{name}'")]
    UnknownHyperparameter {
        /// Hyperparameter name.
        name: String,
    },

    /// Returned when a configuration omits a hyperparameter of the space.
    #[error("configuration is missing hyperparameter '{name}'")]
    MissingHyperparameter {
        /// Hyperparameter name.
        name: String,
    },

    /// Returned when a configuration value is outside its domain.
    #[error("value {value} is outside the domain of hyperparameter '{name}'")]
    ValueOutOfDomain {
        /// Hyperparameter name.
        name: String,
        /// The rejected value.
        value: Value,
    },
}
