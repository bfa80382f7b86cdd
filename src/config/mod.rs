//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Runner configuration loaded from environment variables
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Built-in map to load when no map file is given
    pub map_id: u32,
    /// Optional JSON map file, overrides `map_id`
    pub map_file: Option<PathBuf>,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Number of bot sessions connected to the loopback relay
    pub bot_count: usize,
    /// Seconds to run before shutting down; 0 runs until Ctrl+C
    pub run_secs: u64,
    /// Base seed for bot input
    pub seed: u64,
    /// Health removed per confirmed hit
    pub hit_damage: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            map_id: 1,
            map_file: None,
            tick_rate: 60,
            bot_count: 2,
            run_secs: 10,
            seed: 42,
            hit_damage: 10.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name -> value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tick_rate = parse_or(&lookup, "TICK_RATE", defaults.tick_rate)?;
        if tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        let hit_damage: f32 = parse_or(&lookup, "HIT_DAMAGE", defaults.hit_damage)?;
        if !hit_damage.is_finite() || hit_damage < 0.0 {
            return Err(ConfigError::Invalid("HIT_DAMAGE"));
        }

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            map_id: parse_or(&lookup, "MAP_ID", defaults.map_id)?,
            map_file: lookup("MAP_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            tick_rate,
            bot_count: parse_or(&lookup, "BOT_COUNT", defaults.bot_count)?,
            run_secs: parse_or(&lookup, "RUN_SECS", defaults.run_secs)?,
            seed: parse_or(&lookup, "SEED", defaults.seed)?,
            hit_damage,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
