use clap::Args;

use crate::error::ConfigError;

pub const DEFAULT_RATIO_ACTIONS: f64 = 3.0;
pub const DEFAULT_RATIO_VOLUME: f64 = 1.5;
pub const DEFAULT_SLOT_SIZE: usize = 10;

/// Weights applied to a user's totals before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub ratio_actions: f64,
    pub ratio_volume: f64,
    pub total_multiplier: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ratio_actions: DEFAULT_RATIO_ACTIONS,
            ratio_volume: DEFAULT_RATIO_VOLUME,
            total_multiplier: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    pub weights: ScoreWeights,
    pub slot_size: usize,
}

impl SelectionConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        let ScoreWeights {
            ratio_actions,
            ratio_volume,
            total_multiplier,
        } = self.weights;

        for (name, value) in [
            ("ratio_actions", ratio_actions),
            ("ratio_volume", ratio_volume),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRatio { name, value });
            }
        }
        if ratio_actions == 0.0 && ratio_volume == 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        if total_multiplier == 0 {
            return Err(ConfigError::ZeroMultiplier);
        }
        if self.slot_size == 0 {
            return Err(ConfigError::ZeroSlotSize);
        }
        Ok(self)
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            slot_size: DEFAULT_SLOT_SIZE,
        }
    }
}

/// Selection flags shared by the subcommands that score users.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    #[arg(long, env = "RATIO_ACTIONS", default_value_t = DEFAULT_RATIO_ACTIONS)]
    pub ratio_actions: f64,
    #[arg(long, env = "RATIO_VOLUME", default_value_t = DEFAULT_RATIO_VOLUME)]
    pub ratio_volume: f64,
    #[arg(long, env = "TOTAL_MULTIPLIER")]
    pub total_multiplier: u32,
    #[arg(long, env = "SLOT_SIZE", default_value_t = DEFAULT_SLOT_SIZE)]
    pub slot_size: usize,
}

impl SelectionArgs {
    pub fn to_config(&self) -> Result<SelectionConfig, ConfigError> {
        SelectionConfig {
            weights: ScoreWeights {
                ratio_actions: self.ratio_actions,
                ratio_volume: self.ratio_volume,
                total_multiplier: self.total_multiplier,
            },
            slot_size: self.slot_size,
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SelectionConfig::default().validate().unwrap();
        assert_eq!(config.weights.ratio_actions, 3.0);
        assert_eq!(config.weights.ratio_volume, 1.5);
        assert_eq!(config.slot_size, 10);
    }

    #[test]
    fn rejects_negative_ratio() {
        let mut config = SelectionConfig::default();
        config.weights.ratio_volume = -1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRatio {
                name: "ratio_volume",
                value: -1.5
            })
        );
    }

    #[test]
    fn rejects_zero_weights_and_sizes() {
        let mut config = SelectionConfig::default();
        config.weights.ratio_actions = 0.0;
        config.weights.ratio_volume = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroWeights));

        let mut config = SelectionConfig::default();
        config.weights.total_multiplier = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroMultiplier));

        let mut config = SelectionConfig::default();
        config.slot_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSlotSize));
    }

    #[test]
    fn args_convert_into_config() {
        let args = SelectionArgs {
            ratio_actions: 2.0,
            ratio_volume: 1.0,
            total_multiplier: 250,
            slot_size: 5,
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.weights.total_multiplier, 250);
        assert_eq!(config.slot_size, 5);
    }
}
