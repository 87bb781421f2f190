//! Named collections of hyperparameters.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SpaceError;
use crate::hyperparameter::Hyperparameter;
use crate::value::Configuration;

/// A named set of independent hyperparameters, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSpace {
    name: String,
    hyperparameters: Vec<Hyperparameter>,
}

impl ConfigurationSpace {
    /// Create an empty space.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hyperparameters: Vec::new(),
        }
    }

    /// Add a hyperparameter.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::DuplicateHyperparameter`] when the name is taken.
    pub fn add_hyperparameter(&mut self, hp: Hyperparameter) -> Result<&mut Self, SpaceError> {
        if self.get(hp.name()).is_some() {
            return Err(SpaceError::DuplicateHyperparameter {
                name: hp.name().to_owned(),
            });
        }
        self.hyperparameters.push(hp);
        Ok(self)
    }

    /// Return the space name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a hyperparameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Hyperparameter> {
        self.hyperparameters.iter().find(|hp| hp.name() == name)
    }

    /// Iterate over the hyperparameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Hyperparameter> {
        self.hyperparameters.iter()
    }

    /// Return the number of hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hyperparameters.len()
    }

    /// Return `true` when the space holds no hyperparameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hyperparameters.is_empty()
    }

    /// Return the configuration made of every default value.
    #[must_use]
    pub fn default_configuration(&self) -> Configuration {
        self.iter()
            .map(|hp| (hp.name().to_owned(), hp.default_value()))
            .collect()
    }

    /// Draw one value per hyperparameter.
    pub fn sample_configuration(&self, rng: &mut impl Rng) -> Configuration {
        let config: Configuration = self
            .iter()
            .map(|hp| (hp.name().to_owned(), hp.sample(rng)))
            .collect();
        debug!(space = %self.name, n_values = config.len(), "configuration sampled");
        config
    }

    /// Check that `config` assigns an in-domain value to exactly the
    /// hyperparameters of this space.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SpaceError::UnknownHyperparameter`] | `config` names something outside the space |
    /// | [`SpaceError::MissingHyperparameter`] | a hyperparameter has no value |
    /// | [`SpaceError::ValueOutOfDomain`] | a value is outside its domain |
    pub fn check_configuration(&self, config: &Configuration) -> Result<(), SpaceError> {
        if let Some((name, _)) = config.iter().find(|(name, _)| self.get(name).is_none()) {
            return Err(SpaceError::UnknownHyperparameter {
                name: name.to_owned(),
            });
        }
        for hp in self.iter() {
            let Some(value) = config.get(hp.name()) else {
                return Err(SpaceError::MissingHyperparameter {
                    name: hp.name().to_owned(),
                });
            };
            if !hp.contains(value) {
                return Err(SpaceError::ValueOutOfDomain {
                    name: hp.name().to_owned(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}
