//! Engine Configuration
//!
//! Static parameters of the round lifecycle. Loaded once at startup from
//! TOML and/or environment; a replacement can be staged at runtime and
//! takes effect at the start of the next round.
//!
//! ```toml
//! wait_time_min_ms = 3000
//! wait_time_max_ms = 7000
//! tick_period_ms = 16
//!
//! [growth]
//! mode = "exponential"
//! rate = 0.55
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::hazard::HazardParams;
use crate::game::ledger::MIN_AUTO_CASH_OUT;
use crate::game::multiplier::GrowthMode;
use crate::game::stats::DEFAULT_HISTORY_CAPACITY;

/// Environment variable naming a TOML config file.
pub const CONFIG_PATH_ENV: &str = "CRASH_ENGINE_CONFIG";
/// Environment override for `tick_period_ms`.
pub const TICK_PERIOD_ENV: &str = "CRASH_TICK_MS";
/// Environment override for `history_capacity`.
pub const HISTORY_SIZE_ENV: &str = "CRASH_HISTORY_SIZE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Growth curve is flat, decreasing or not finite.
    #[error("invalid growth curve: {0}")]
    InvalidGrowth(String),
    /// Hazard parameters are malformed.
    #[error("invalid hazard parameters: {0}")]
    InvalidHazard(String),
    /// Wait time range is reversed.
    #[error("wait time range is empty: min {min}ms > max {max}ms")]
    InvalidWaitRange {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },
    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    /// History capacity is zero.
    #[error("history capacity must be greater than zero")]
    ZeroHistory,
    /// Minimum auto cash-out would allow a guaranteed loss.
    #[error("minimum auto cash-out must be at least 1.0, got {0}")]
    InvalidAutoCashOut(f64),
    /// Environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Round lifecycle configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shortest WAITING phase.
    pub wait_time_min_ms: u64,
    /// Longest WAITING phase.
    pub wait_time_max_ms: u64,
    /// STARTING countdown.
    pub countdown_ms: u64,
    /// FLYING tick period.
    pub tick_period_ms: u64,
    /// Flights are cut off after this long.
    pub max_flight_ms: u64,
    /// How long the crash point is shown before the next round.
    pub cooldown_ms: u64,
    /// Crash points kept in history.
    pub history_capacity: usize,
    /// Lowest accepted auto cash-out threshold.
    pub min_auto_cash_out: f64,
    /// Multiplier growth curve.
    pub growth: GrowthMode,
    /// Crash hazard.
    pub hazard: HazardParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait_time_min_ms: 3000,
            wait_time_max_ms: 7000,
            countdown_ms: 3000,
            tick_period_ms: crate::DEFAULT_TICK_PERIOD_MS,
            max_flight_ms: 45_000,
            cooldown_ms: 2000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            min_auto_cash_out: MIN_AUTO_CASH_OUT,
            growth: GrowthMode::default(),
            hazard: HazardParams::default(),
        }
    }
}

impl EngineConfig {
    /// Check every constraint the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_time_min_ms > self.wait_time_max_ms {
            return Err(ConfigError::InvalidWaitRange {
                min: self.wait_time_min_ms,
                max: self.wait_time_max_ms,
            });
        }
        if self.countdown_ms == 0 {
            return Err(ConfigError::ZeroDuration("countdown_ms"));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroDuration("tick_period_ms"));
        }
        if self.max_flight_ms == 0 {
            return Err(ConfigError::ZeroDuration("max_flight_ms"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if self.min_auto_cash_out.is_nan() || self.min_auto_cash_out < 1.0 {
            return Err(ConfigError::InvalidAutoCashOut(self.min_auto_cash_out));
        }
        self.growth.validate()?;
        self.hazard.validate()
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from environment variables.
    ///
    /// Reads the file named by `CRASH_ENGINE_CONFIG` if set, then applies
    /// `CRASH_TICK_MS` and `CRASH_HISTORY_SIZE` on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };

        if let Some(tick) = env_override(TICK_PERIOD_ENV)? {
            config.tick_period_ms = tick;
        }
        if let Some(size) = env_override(HISTORY_SIZE_ENV)? {
            config.history_capacity = size;
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_override<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}
