//! Error types for the treasure-hunt core.
//!
//! Everything here is recoverable: rejected operations come back as values
//! and nothing panics across the crate boundary. Cancellation of an open is
//! an outcome, not an error (see [`crate::chest::OpenOutcome`]).

use crate::chest::ChestState;

/// Recoverable gameplay errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("chest {index} cannot start opening while {state}")]
    ChestNotClosed { index: usize, state: ChestState },

    #[error("chest index {index} is out of range for a round of {count} chests")]
    ChestOutOfRange { index: usize, count: usize },
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("failed to read configuration file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_display() {
        let err = GameError::ChestNotClosed {
            index: 3,
            state: ChestState::Opening,
        };
        assert_eq!(err.to_string(), "chest 3 cannot start opening while opening");

        let err = GameError::ChestOutOfRange { index: 9, count: 5 };
        assert!(err.to_string().contains("out of range"));
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn test_config_error_keeps_source() {
        use std::error::Error;

        let err = ConfigError::Io {
            path: "game.toml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("game.toml"));
        assert!(err.source().is_some());
    }
}
