//! Random Forest classification with warm-start growth.
//!
//! Provides a hand-rolled Random Forest classifier with CART decision trees,
//! Gini/Entropy split criteria, weighted and sparse input, multi-output
//! targets, parallel training via rayon, and model serialization.

mod config;
mod confusion;
mod error;
mod forest;
mod matrix;
mod node;
mod predict;
mod serialize;
mod split;
mod target;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForestClassifier;
pub use matrix::{CsrMatrix, FeatureMatrix};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use split::SplitCriterion;
pub use target::{Probabilities, Targets};
pub use tree::DecisionTree;
