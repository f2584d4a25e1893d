//! Game configuration with validation and defaults.
//!
//! Loaded by the embedding application before the core runs; the controller
//! validates on construction so an out-of-range asset never reaches play.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable rules for a treasure-hunt round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    /// Chests dealt per round.
    pub chest_count: usize,
    /// Completed non-winning opens allowed before the round is lost.
    pub max_attempts: u32,
    /// How long a chest takes to open once selected.
    pub open_duration_ms: u64,
    pub min_reward_amount: u32,
    pub max_reward_amount: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            chest_count: 5,
            max_attempts: 3,
            open_duration_ms: 2000,
            min_reward_amount: 10,
            max_reward_amount: 100,
        }
    }
}

impl GameConfig {
    pub const MIN_CHEST_COUNT: usize = 3;
    pub const MAX_CHEST_COUNT: usize = 12;
    pub const MAX_ATTEMPT_LIMIT: u32 = 10;

    /// Short opens, for demos and fast iteration.
    pub fn quick_play() -> Self {
        Self {
            open_duration_ms: 250,
            ..Default::default()
        }
    }

    /// Read and validate a config from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_CHEST_COUNT..=Self::MAX_CHEST_COUNT).contains(&self.chest_count) {
            return Err(ConfigError::InvalidValue(format!(
                "chest_count must be between {} and {}, got {}",
                Self::MIN_CHEST_COUNT,
                Self::MAX_CHEST_COUNT,
                self.chest_count
            )));
        }

        if self.max_attempts == 0 || self.max_attempts > Self::MAX_ATTEMPT_LIMIT {
            return Err(ConfigError::InvalidValue(format!(
                "max_attempts must be between 1 and {}, got {}",
                Self::MAX_ATTEMPT_LIMIT,
                self.max_attempts
            )));
        }

        if self.open_duration_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "open_duration_ms must be > 0".to_string(),
            ));
        }

        if self.min_reward_amount > self.max_reward_amount {
            return Err(ConfigError::InvalidValue(format!(
                "min_reward_amount {} exceeds max_reward_amount {}",
                self.min_reward_amount, self.max_reward_amount
            )));
        }

        Ok(())
    }

    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_duration_ms)
    }
}
