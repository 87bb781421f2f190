//! Declarative hyperparameter configuration spaces.
//!
//! A [`ConfigurationSpace`] lists named [`Hyperparameter`]s with their
//! domains. It yields default and randomly sampled [`Configuration`]s and
//! checks externally supplied ones.

mod error;
mod hyperparameter;
mod space;
mod value;

pub use error::SpaceError;
pub use hyperparameter::{Domain, Hyperparameter};
pub use space::ConfigurationSpace;
pub use value::{Configuration, Value};
