use std::{fs, num::NonZeroUsize, path::Path};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    MlErr, Result,
    initialization::InitScheme,
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
};

/// Which update rule to train with. The learning rate is shared by all of them and lives in
/// `TrainingConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    #[default]
    GradientDescent,
    GradientDescentWithMomentum {
        momentum: f32,
    },
    Adam {
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
}

/// The training hyperparameters. Every field is optional in the JSON form and falls back to
/// `TrainingConfig::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f32,
    pub batch_size: NonZeroUsize,
    pub epochs: NonZeroUsize,
    /// Seed for parameter initialization and shuffling, drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Whether to reshuffle the training split before every epoch.
    pub shuffle: bool,
    /// How many batches go by between progress reports.
    pub log_every: NonZeroUsize,
    pub optimizer: OptimizerConfig,
    pub init: InitScheme,
}

const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();
const DEFAULT_EPOCHS: NonZeroUsize = NonZeroUsize::new(5).unwrap();
const DEFAULT_LOG_EVERY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            batch_size: DEFAULT_BATCH_SIZE,
            epochs: DEFAULT_EPOCHS,
            seed: None,
            shuffle: false,
            log_every: DEFAULT_LOG_EVERY,
            optimizer: OptimizerConfig::default(),
            init: InitScheme::default(),
        }
    }
}

impl TrainingConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks the values serde can't.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.) {
            return Err(MlErr::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }

        match self.optimizer {
            OptimizerConfig::GradientDescent => {}
            OptimizerConfig::GradientDescentWithMomentum { momentum } => {
                if !(0. ..1.).contains(&momentum) {
                    return Err(MlErr::InvalidConfig(format!(
                        "momentum must be in [0, 1), got {momentum}"
                    )));
                }
            }
            OptimizerConfig::Adam {
                beta1,
                beta2,
                epsilon,
            } => {
                if !(0. ..1.).contains(&beta1) || !(0. ..1.).contains(&beta2) {
                    return Err(MlErr::InvalidConfig(format!(
                        "adam betas must be in [0, 1), got {beta1} and {beta2}"
                    )));
                }
                if !(epsilon > 0.) {
                    return Err(MlErr::InvalidConfig(format!(
                        "adam epsilon must be positive, got {epsilon}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Creates the configured optimizer for a model of `len` parameters.
    pub fn build_optimizer(&self, len: usize) -> Box<dyn Optimizer> {
        let lr = self.learning_rate;

        match self.optimizer {
            OptimizerConfig::GradientDescent => Box::new(GradientDescent::new(lr)),
            OptimizerConfig::GradientDescentWithMomentum { momentum } => {
                Box::new(GradientDescentWithMomentum::new(len, lr, momentum))
            }
            OptimizerConfig::Adam {
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(len, lr, beta1, beta2, epsilon)),
        }
    }

    /// Returns a random number generator following the configured seed, used to initialize
    /// the parameters.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Returns the generator that reorders the training split. Its stream is independent from
    /// `rng`'s even when both follow the configured seed.
    pub fn shuffle_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_quickstart_hyperparameters() {
        let config = TrainingConfig::default();

        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.batch_size.get(), 64);
        assert_eq!(config.epochs.get(), 5);
        assert_eq!(config.log_every.get(), 100);
        assert_eq!(config.optimizer, OptimizerConfig::GradientDescent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = TrainingConfig::from_json(r#"{ "epochs": 2, "seed": 9 }"#).unwrap();

        assert_eq!(config.epochs.get(), 2);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.batch_size.get(), 64);
    }

    #[test]
    fn parses_optimizers() {
        let config = TrainingConfig::from_json(
            r#"{ "optimizer": { "kind": "adam", "beta1": 0.9, "beta2": 0.999, "epsilon": 1e-8 } }"#,
        )
        .unwrap();

        assert!(matches!(config.optimizer, OptimizerConfig::Adam { .. }));
    }

    #[test]
    fn parses_init_schemes() {
        let config = TrainingConfig::from_json(r#"{ "init": { "kind": "kaiming" } }"#).unwrap();
        assert_eq!(config.init, InitScheme::Kaiming);
        assert_eq!(TrainingConfig::default().init, InitScheme::LinearDefault);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(TrainingConfig::from_json(r#"{ "batch_size": 0 }"#).is_err());
        assert!(TrainingConfig::from_json(r#"{ "learning_rate": -1.0 }"#).is_err());
        assert!(
            TrainingConfig::from_json(
                r#"{ "optimizer": { "kind": "gradient_descent_with_momentum", "momentum": 1.5 } }"#
            )
            .is_err()
        );
        assert!(TrainingConfig::from_json(r#"{ "optimizer": { "kind": "rmsprop" } }"#).is_err());
    }

    #[test]
    fn seeded_rngs_agree() {
        use rand::Rng;

        let config = TrainingConfig {
            seed: Some(1),
            ..Default::default()
        };

        assert_eq!(config.rng().random::<u64>(), config.rng().random::<u64>());
        assert_eq!(
            config.shuffle_rng().random::<u64>(),
            config.shuffle_rng().random::<u64>()
        );
    }

    #[test]
    fn shuffle_and_init_streams_differ() {
        use rand::Rng;

        let config = TrainingConfig {
            seed: Some(u64::MAX),
            ..Default::default()
        };
        let (mut init_rng, mut shuffle_rng) = (config.rng(), config.shuffle_rng());

        let init: [u64; 4] = std::array::from_fn(|_| init_rng.random());
        let shuffle: [u64; 4] = std::array::from_fn(|_| shuffle_rng.random());
        assert_ne!(init, shuffle);
    }
}
