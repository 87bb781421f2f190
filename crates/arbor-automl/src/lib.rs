//! Random forest classifier adapter for configuration search.
//!
//! [`RandomForest`] turns a sampled [`Configuration`](arbor_space::Configuration)
//! into an `arbor-forest` ensemble that grows a few trees per
//! [`iterative_fit`](ClassificationAlgorithm::iterative_fit) call, so a search
//! loop can evaluate partially trained models and stop early.

mod algorithm;
mod error;
mod hyperparams;
mod properties;
mod random_forest;

pub use algorithm::ClassificationAlgorithm;
pub use error::AdapterError;
pub use hyperparams::{NormalizedConfig, RawConfig};
pub use properties::{DataLayout, Dtype, OutputKind, Properties};
pub use random_forest::{ESTIMATOR_INCREMENT, RandomForest};
