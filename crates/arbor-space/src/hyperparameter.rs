//! Hyperparameter domains: categorical, uniform ranges, and fixed values.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SpaceError;
use crate::value::Value;

/// The set of values a hyperparameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    /// One of a finite list of choices.
    Categorical {
        /// Allowed values, in declaration order.
        choices: Vec<Value>,
        /// Default choice.
        default: Value,
    },
    /// A float in `[lower, upper]`.
    UniformFloat {
        /// Lower bound (inclusive).
        lower: f64,
        /// Upper bound (inclusive).
        upper: f64,
        /// Default value.
        default: f64,
        /// Sample uniformly in log space.
        log: bool,
    },
    /// An integer in `[lower, upper]`.
    UniformInteger {
        /// Lower bound (inclusive).
        lower: i64,
        /// Upper bound (inclusive).
        upper: i64,
        /// Default value.
        default: i64,
        /// Sample uniformly in log space.
        log: bool,
    },
    /// A fixed value that is part of the search but never varies.
    Constant {
        /// The value.
        value: Value,
    },
    /// A fixed value the search does not tune.
    UnParametrized {
        /// The value.
        value: Value,
    },
}

/// A named hyperparameter with its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameter {
    name: String,
    #[serde(flatten)]
    domain: Domain,
}

impl Hyperparameter {
    /// Create a categorical hyperparameter.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SpaceError::EmptyChoices`] | `choices` is empty |
    /// | [`SpaceError::DuplicateChoice`] | a choice appears twice |
    /// | [`SpaceError::DefaultOutOfDomain`] | `default` is not a choice |
    pub fn categorical(
        name: impl Into<String>,
        choices: Vec<Value>,
        default: impl Into<Value>,
    ) -> Result<Self, SpaceError> {
        let name = name.into();
        let default = default.into();
        if choices.is_empty() {
            return Err(SpaceError::EmptyChoices { name });
        }
        for (i, choice) in choices.iter().enumerate() {
            if choices[..i].contains(choice) {
                return Err(SpaceError::DuplicateChoice {
                    name,
                    choice: choice.clone(),
                });
            }
        }
        if !choices.contains(&default) {
            return Err(SpaceError::DefaultOutOfDomain { name, default });
        }
        Ok(Self {
            name,
            domain: Domain::Categorical { choices, default },
        })
    }

    /// Create a float hyperparameter on `[lower, upper]`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SpaceError::InvalidBounds`] | `lower >= upper` or a bound is not finite |
    /// | [`SpaceError::NonPositiveLogBound`] | `log` with `lower <= 0` |
    /// | [`SpaceError::DefaultOutOfDomain`] | `default` outside the bounds |
    pub fn uniform_float(
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        default: f64,
        log: bool,
    ) -> Result<Self, SpaceError> {
        let name = name.into();
        check_range(&name, lower, upper, log)?;
        if !(lower..=upper).contains(&default) {
            return Err(SpaceError::DefaultOutOfDomain {
                name,
                default: Value::Float(default),
            });
        }
        Ok(Self {
            name,
            domain: Domain::UniformFloat {
                lower,
                upper,
                default,
                log,
            },
        })
    }

    /// Create an integer hyperparameter on `[lower, upper]`.
    ///
    /// # Errors
    ///
    /// Same as [`uniform_float`](Self::uniform_float).
    pub fn uniform_integer(
        name: impl Into<String>,
        lower: i64,
        upper: i64,
        default: i64,
        log: bool,
    ) -> Result<Self, SpaceError> {
        let name = name.into();
        check_range(&name, lower as f64, upper as f64, log)?;
        if !(lower..=upper).contains(&default) {
            return Err(SpaceError::DefaultOutOfDomain {
                name,
                default: Value::Int(default),
            });
        }
        Ok(Self {
            name,
            domain: Domain::UniformInteger {
                lower,
                upper,
                default,
                log,
            },
        })
    }

    /// Create a constant hyperparameter.
    #[must_use]
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Constant {
                value: value.into(),
            },
        }
    }

    /// Create an unparametrized hyperparameter.
    #[must_use]
    pub fn unparametrized(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            domain: Domain::UnParametrized {
                value: value.into(),
            },
        }
    }

    /// Return the hyperparameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the domain.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Return the default value.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match &self.domain {
            Domain::Categorical { default, .. } => default.clone(),
            Domain::UniformFloat { default, .. } => Value::Float(*default),
            Domain::UniformInteger { default, .. } => Value::Int(*default),
            Domain::Constant { value } | Domain::UnParametrized { value } => value.clone(),
        }
    }

    /// Draw a value from the domain.
    pub fn sample(&self, rng: &mut impl Rng) -> Value {
        match &self.domain {
            Domain::Categorical { choices, .. } => choices[rng.gen_range(0..choices.len())].clone(),
            Domain::UniformFloat {
                lower, upper, log, ..
            } => {
                let v = if *log {
                    rng.gen_range(lower.ln()..=upper.ln()).exp()
                } else {
                    rng.gen_range(*lower..=*upper)
                };
                Value::Float(v.clamp(*lower, *upper))
            }
            Domain::UniformInteger {
                lower, upper, log, ..
            } => {
                let v = if *log {
                    let lo = (*lower as f64).ln();
                    let hi = ((*upper + 1) as f64).ln();
                    (rng.gen_range(lo..hi).exp().floor() as i64).clamp(*lower, *upper)
                } else {
                    rng.gen_range(*lower..=*upper)
                };
                Value::Int(v)
            }
            Domain::Constant { value } | Domain::UnParametrized { value } => value.clone(),
        }
    }

    /// Return `true` when `value` belongs to the domain.
    ///
    /// Float ranges also accept integers inside the bounds.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match &self.domain {
            Domain::Categorical { choices, .. } => choices.contains(value),
            Domain::UniformFloat { lower, upper, .. } => value
                .as_f64()
                .is_some_and(|v| (*lower..=*upper).contains(&v)),
            Domain::UniformInteger { lower, upper, .. } => value
                .as_i64()
                .is_some_and(|v| (*lower..=*upper).contains(&v)),
            Domain::Constant { value: fixed } | Domain::UnParametrized { value: fixed } => {
                fixed == value
            }
        }
    }
}

fn check_range(name: &str, lower: f64, upper: f64, log: bool) -> Result<(), SpaceError> {
    if !(lower.is_finite() && upper.is_finite() && lower < upper) {
        return Err(SpaceError::InvalidBounds {
            name: name.to_owned(),
            lower,
            upper,
        });
    }
    if log && lower <= 0.0 {
        return Err(SpaceError::NonPositiveLogBound {
            name: name.to_owned(),
            lower,
        });
    }
    Ok(())
}
