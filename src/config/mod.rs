//! Configuration module - environment variable parsing

use std::env;

use crate::game::catalog::GameMode;

const DEFAULT_ROOM_KEY: &str = "game:demo";
const DEFAULT_BOT_COUNT: usize = 4;
const DEFAULT_MATCH_SEED: u64 = 7;

/// Demo configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Room channel key all participants subscribe to
    pub room_key: String,
    /// Game mode for the demo match
    pub mode: GameMode,
    /// Number of simulated players to spawn
    pub bot_count: usize,
    /// Seed for bot movement and weapon spread
    pub match_seed: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env::var("GAME_MODE") {
            Ok(value) => GameMode::parse(&value).ok_or(ConfigError::InvalidMode(value))?,
            Err(_) => GameMode::Deathmatch,
        };

        let bot_count = match env::var("BOT_COUNT") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("BOT_COUNT"))?,
            Err(_) => DEFAULT_BOT_COUNT,
        };

        let match_seed = match env::var("MATCH_SEED") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("MATCH_SEED"))?,
            Err(_) => DEFAULT_MATCH_SEED,
        };

        Ok(Self {
            room_key: env::var("ROOM_KEY").unwrap_or_else(|_| DEFAULT_ROOM_KEY.to_string()),
            mode,
            bot_count,
            match_seed,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown game mode: {0}")]
    InvalidMode(String),

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}
