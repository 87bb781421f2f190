//! Raw hyperparameter values and their one-way normalization.

use arbor_forest::{MaxFeatures, RandomForestConfig, RfError, SplitCriterion};
use arbor_space::{Configuration, Value};
use serde::{Deserialize, Serialize};

/// The sentinel string meaning "no limit".
const NONE_TOKEN: &str = "None";

/// Hyperparameters exactly as a sampler produced them.
///
/// Values are not assumed to be typed: integers may arrive as floats or
/// strings, booleans as `"True"`/`"False"`, and limits as `"None"`.
/// Coercion happens once, in [`normalize`](Self::normalize).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    /// Target number of trees.
    pub n_estimators: Value,
    /// Split quality measure, `"gini"` or `"entropy"`.
    pub criterion: Value,
    /// Feature multiplier, or `"sqrt"`, `"log2"` or `"auto"`.
    pub max_features: Value,
    /// Depth limit, or `"None"` for unbounded.
    pub max_depth: Value,
    /// Samples required to split a node.
    pub min_samples_split: Value,
    /// Samples required in each leaf.
    pub min_samples_leaf: Value,
    /// Fraction of total sample weight required in each leaf.
    pub min_weight_fraction_leaf: Value,
    /// Leaf limit per tree, or `"None"` for unbounded.
    pub max_leaf_nodes: Value,
    /// Whether trees train on bootstrap samples.
    pub bootstrap: Value,
}

impl Default for RawConfig {
    /// The defaults of the random forest search space.
    fn default() -> Self {
        Self {
            n_estimators: Value::Int(100),
            criterion: Value::from("gini"),
            max_features: Value::Float(1.0),
            max_depth: Value::from(NONE_TOKEN),
            min_samples_split: Value::Int(2),
            min_samples_leaf: Value::Int(1),
            min_weight_fraction_leaf: Value::Float(0.0),
            max_leaf_nodes: Value::from(NONE_TOKEN),
            bootstrap: Value::from("True"),
        }
    }
}

impl RawConfig {
    /// Take every recognized hyperparameter from `config`.
    ///
    /// Unrecognized names are ignored and no value is inspected.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::MissingHyperparameter`](crate::AdapterError::MissingHyperparameter)
    /// when a recognized name is absent.
    pub fn from_configuration(config: &Configuration) -> Result<Self, crate::AdapterError> {
        let take = |name: &'static str| {
            config
                .get(name)
                .cloned()
                .ok_or(crate::AdapterError::MissingHyperparameter { name })
        };
        Ok(Self {
            n_estimators: take("n_estimators")?,
            criterion: take("criterion")?,
            max_features: take("max_features")?,
            max_depth: take("max_depth")?,
            min_samples_split: take("min_samples_split")?,
            min_samples_leaf: take("min_samples_leaf")?,
            min_weight_fraction_leaf: take("min_weight_fraction_leaf")?,
            max_leaf_nodes: take("max_leaf_nodes")?,
            bootstrap: take("bootstrap")?,
        })
    }

    /// Return the values as a [`Configuration`].
    #[must_use]
    pub fn to_configuration(&self) -> Configuration {
        [
            ("n_estimators", &self.n_estimators),
            ("criterion", &self.criterion),
            ("max_features", &self.max_features),
            ("max_depth", &self.max_depth),
            ("min_samples_split", &self.min_samples_split),
            ("min_samples_leaf", &self.min_samples_leaf),
            ("min_weight_fraction_leaf", &self.min_weight_fraction_leaf),
            ("max_leaf_nodes", &self.max_leaf_nodes),
            ("bootstrap", &self.bootstrap),
        ]
        .into_iter()
        .map(|(name, value)| (name, value.clone()))
        .collect()
    }

    /// Coerce every value into its engine type.
    ///
    /// Unless `max_features` is one of `sqrt`, `log2` or `auto`, it is a
    /// multiplier `m` and the per-split feature count becomes
    /// `max(1, min(n / 2, trunc(m * (ln(n) + 1))))` for `n` attributes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AdapterError::Conversion`](crate::AdapterError::Conversion) | a value cannot be coerced |
    /// | [`AdapterError::Engine`](crate::AdapterError::Engine) | `n_estimators` is zero |
    pub fn normalize(&self, num_attributes: usize) -> Result<NormalizedConfig, crate::AdapterError> {
        let n_estimators = to_count("n_estimators", &self.n_estimators)?;
        if n_estimators == 0 {
            return Err(RfError::InvalidTreeCount { n_trees: 0 }.into());
        }
        Ok(NormalizedConfig {
            n_estimators,
            criterion: to_criterion(&self.criterion)?,
            max_features: to_max_features(&self.max_features, num_attributes)?,
            max_depth: to_limit("max_depth", &self.max_depth)?,
            min_samples_split: to_count("min_samples_split", &self.min_samples_split)?,
            min_samples_leaf: to_count("min_samples_leaf", &self.min_samples_leaf)?,
            min_weight_fraction_leaf: to_float(
                "min_weight_fraction_leaf",
                &self.min_weight_fraction_leaf,
            )?,
            max_leaf_nodes: to_limit("max_leaf_nodes", &self.max_leaf_nodes)?,
            bootstrap: to_bool("bootstrap", &self.bootstrap)?,
        })
    }
}

/// Hyperparameters coerced into the types the engine expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedConfig {
    /// Number of trees the forest grows to.
    pub n_estimators: usize,
    /// Split quality measure.
    pub criterion: SplitCriterion,
    /// Features drawn per split, already scaled to the training width.
    pub max_features: MaxFeatures,
    /// Depth limit; `None` for unbounded.
    pub max_depth: Option<usize>,
    /// Samples required to split a node.
    pub min_samples_split: usize,
    /// Samples required in each leaf.
    pub min_samples_leaf: usize,
    /// Fraction of total sample weight required in each leaf.
    pub min_weight_fraction_leaf: f64,
    /// Leaf limit per tree; `None` for unbounded.
    pub max_leaf_nodes: Option<usize>,
    /// Draw a bootstrap sample per tree.
    pub bootstrap: bool,
}

impl NormalizedConfig {
    /// Build an empty, warm-starting engine config for these values.
    #[must_use]
    pub fn engine_config(&self, seed: u64, n_jobs: Option<usize>) -> RandomForestConfig {
        RandomForestConfig::new(0)
            .with_criterion(self.criterion)
            .with_max_features(self.max_features)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_min_weight_fraction_leaf(self.min_weight_fraction_leaf)
            .with_max_leaf_nodes(self.max_leaf_nodes)
            .with_bootstrap(self.bootstrap)
            .with_seed(seed)
            .with_n_jobs(n_jobs)
            .with_warm_start(true)
    }
}

fn conversion(name: &'static str, value: &Value, expected: &'static str) -> crate::AdapterError {
    crate::AdapterError::Conversion {
        name,
        value: value.clone(),
        expected,
    }
}

fn to_float(name: &'static str, value: &Value) -> Result<f64, crate::AdapterError> {
    let parsed = match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| conversion(name, value, "a finite number"))
}

/// Non-negative integer; floats are truncated toward zero.
fn to_count(name: &'static str, value: &Value) -> Result<usize, crate::AdapterError> {
    let expected = "a non-negative integer";
    let parsed = match value {
        Value::Int(v) => Some(*v),
        Value::Float(v) if v.is_finite() => Some(v.trunc() as i64),
        Value::Str(s) => s.trim().parse::<i64>().ok(),
        Value::Float(_) | Value::Bool(_) => None,
    };
    parsed
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| conversion(name, value, expected))
}

/// `"None"` means no limit; anything else must be a count.
fn to_limit(name: &'static str, value: &Value) -> Result<Option<usize>, crate::AdapterError> {
    if value.as_str() == Some(NONE_TOKEN) {
        return Ok(None);
    }
    to_count(name, value)
        .map(Some)
        .map_err(|_| conversion(name, value, "\"None\" or a non-negative integer"))
}

fn to_bool(name: &'static str, value: &Value) -> Result<bool, crate::AdapterError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Str(s) if s == "True" => Ok(true),
        Value::Str(s) if s == "False" => Ok(false),
        _ => Err(conversion(name, value, "\"True\", \"False\" or a boolean")),
    }
}

fn to_criterion(value: &Value) -> Result<SplitCriterion, crate::AdapterError> {
    match value.as_str() {
        Some("gini") => Ok(SplitCriterion::Gini),
        Some("entropy") => Ok(SplitCriterion::Entropy),
        _ => Err(conversion("criterion", value, "\"gini\" or \"entropy\"")),
    }
}

fn to_max_features(
    value: &Value,
    num_attributes: usize,
) -> Result<MaxFeatures, crate::AdapterError> {
    match value.as_str() {
        Some("sqrt" | "auto") => return Ok(MaxFeatures::Sqrt),
        Some("log2") => return Ok(MaxFeatures::Log2),
        _ => {}
    }
    let multiplier = to_float("max_features", value)
        .map_err(|_| conversion("max_features", value, "\"sqrt\", \"log2\", \"auto\" or a number"))?;
    Ok(MaxFeatures::Fixed(derive_max_features(multiplier, num_attributes)))
}

/// `max(1, min(n / 2, trunc(multiplier * (ln(n) + 1))))`.
pub(crate) fn derive_max_features(multiplier: f64, num_attributes: usize) -> usize {
    let scaled = (multiplier * ((num_attributes as f64).ln() + 1.0)).trunc();
    // Saturating cast: negative or -inf products collapse to the floor of 1.
    let scaled = if scaled > 0.0 { scaled as usize } else { 0 };
    scaled.min(num_attributes / 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdapterError;

    #[test]
    fn derived_max_features() {
        // 1 * (ln(100) + 1) = 5.6 -> 5, below 100 / 2.
        assert_eq!(derive_max_features(1.0, 100), 5);
        // Capped at half of the attributes.
        assert_eq!(derive_max_features(5.0, 10), 5);
        assert_eq!(derive_max_features(0.5, 3), 1);
        assert_eq!(derive_max_features(1.0, 1), 1);
        assert_eq!(derive_max_features(-2.0, 50), 1);
    }

    #[test]
    fn defaults_normalize_to_engine_defaults() {
        let normalized = RawConfig::default().normalize(100).unwrap();
        assert_eq!(normalized, NormalizedConfig {
            n_estimators: 100,
            criterion: SplitCriterion::Gini,
            max_features: MaxFeatures::Fixed(5),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_weight_fraction_leaf: 0.0,
            max_leaf_nodes: None,
            bootstrap: true,
        });
    }

    #[test]
    fn sentinels_and_string_tokens() {
        let raw = RawConfig {
            n_estimators: Value::Float(20.0),
            criterion: Value::from("entropy"),
            max_features: Value::from("auto"),
            max_depth: Value::from("7"),
            min_samples_split: Value::from("4"),
            max_leaf_nodes: Value::Int(16),
            bootstrap: Value::from("False"),
            ..RawConfig::default()
        };
        let normalized = raw.normalize(9).unwrap();
        assert_eq!(normalized.n_estimators, 20);
        assert_eq!(normalized.criterion, SplitCriterion::Entropy);
        assert_eq!(normalized.max_features, MaxFeatures::Sqrt);
        assert_eq!(normalized.max_depth, Some(7));
        assert_eq!(normalized.min_samples_split, 4);
        assert_eq!(normalized.max_leaf_nodes, Some(16));
        assert!(!normalized.bootstrap);
    }

    #[test]
    fn native_booleans_are_accepted() {
        let raw = RawConfig {
            bootstrap: Value::Bool(false),
            ..RawConfig::default()
        };
        assert!(!raw.normalize(4).unwrap().bootstrap);
    }

    #[test]
    fn unknown_tokens_are_conversion_errors() {
        let raw = RawConfig {
            bootstrap: Value::from("yes"),
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.normalize(4).unwrap_err(),
            AdapterError::Conversion { name: "bootstrap", .. }
        ));

        let raw = RawConfig {
            criterion: Value::from("mse"),
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.normalize(4).unwrap_err(),
            AdapterError::Conversion { name: "criterion", .. }
        ));

        let raw = RawConfig {
            min_samples_leaf: Value::Int(-3),
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.normalize(4).unwrap_err(),
            AdapterError::Conversion { name: "min_samples_leaf", .. }
        ));
    }

    #[test]
    fn zero_estimators_is_rejected() {
        let raw = RawConfig {
            n_estimators: Value::Int(0),
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.normalize(4).unwrap_err(),
            AdapterError::Engine(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn configuration_round_trip() {
        let raw = RawConfig::default();
        let back = RawConfig::from_configuration(&raw.to_configuration()).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn missing_name_is_reported() {
        let mut config = RawConfig::default().to_configuration();
        config = config
            .iter()
            .filter(|(name, _)| *name != "max_depth")
            .map(|(name, value)| (name.to_owned(), value.clone()))
            .collect();
        assert!(matches!(
            RawConfig::from_configuration(&config).unwrap_err(),
            AdapterError::MissingHyperparameter { name: "max_depth" }
        ));
    }

    #[test]
    fn engine_config_starts_empty_and_warm() {
        let normalized = RawConfig::default().normalize(10).unwrap();
        let engine = normalized.engine_config(3, Some(2));
        assert_eq!(engine.n_estimators(), 0);
        assert!(engine.warm_start());
        assert_eq!(engine.seed(), 3);
        assert_eq!(engine.n_jobs(), Some(2));
    }

    #[test]
    fn raw_and_normalized_share_field_names() {
        let raw = serde_json::to_value(RawConfig::default()).unwrap();
        let normalized = serde_json::to_value(RawConfig::default().normalize(10).unwrap()).unwrap();
        let names = |v: &serde_json::Value| {
            let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(names(&raw), names(&normalized));
        assert_eq!(names(&raw).len(), 9);
        assert_eq!(normalized["max_depth"], serde_json::Value::Null);
        assert_eq!(normalized["bootstrap"], true);
    }
}
