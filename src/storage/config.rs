//! Configuration file loading.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/relaybill/config.toml`
//! - Windows: `%APPDATA%/relaybill/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `RELAYBILL_CONFIG`: Override config file path
//! - `RELAYBILL_TIMEOUT`: HTTP timeout in seconds
//! - `RELAYBILL_EXCHANGE_RATE`: Local currency units per USD
//! - `RELAYBILL_SWEEP_FREQUENCY`: Sweep period in minutes (0 disables)
//! - `RELAYBILL_REQUEST_INTERVAL_MS`: Pause between channels during a sweep

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::balance::SweepSettings;
use crate::core::currency::{DEFAULT_EXCHANGE_RATE, ExchangeRate};
use crate::core::job_poller::{DEFAULT_MAX_ATTEMPTS, PollPolicy};
use crate::error::{RelayError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "RELAYBILL_CONFIG";
/// Environment variable for timeout in seconds.
pub const ENV_TIMEOUT: &str = "RELAYBILL_TIMEOUT";
/// Environment variable for the exchange rate.
pub const ENV_EXCHANGE_RATE: &str = "RELAYBILL_EXCHANGE_RATE";
/// Environment variable for the sweep period in minutes.
pub const ENV_SWEEP_FREQUENCY: &str = "RELAYBILL_SWEEP_FREQUENCY";
/// Environment variable for the pause between swept channels.
pub const ENV_REQUEST_INTERVAL_MS: &str = "RELAYBILL_REQUEST_INTERVAL_MS";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub billing: BillingConfig,
    pub sweep: SweepConfig,
    pub poll: PollConfig,
    pub store: StoreConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Timeout for outbound requests in seconds.
    pub timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Currency settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BillingConfig {
    /// Local currency units per USD.
    pub exchange_rate: f64,
}

/// Fleet sweep settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
    /// Period in minutes; 0 disables the background sweep.
    pub frequency_minutes: u64,
    /// Pause between two channels in milliseconds.
    pub request_interval_ms: u64,
}

/// Async job polling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub interval_seconds: u64,
    pub max_attempts: u32,
}

/// Channel store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding channel records.
    pub channels_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            log_level: None,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Load, apply environment overrides and validate.
    ///
    /// `path` wins over `RELAYBILL_CONFIG`, which wins over the default location.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] for unreadable, unparsable or invalid settings.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(
            || {
                std::env::var(ENV_CONFIG)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map_or_else(Self::config_path, PathBuf::from)
            },
            Path::to_path_buf,
        );

        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("Invalid config file: {e}")))
    }

    /// Get the default config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<u64>(ENV_TIMEOUT)? {
            self.general.timeout_seconds = v;
        }
        if let Some(v) = env_parse::<f64>(ENV_EXCHANGE_RATE)? {
            self.billing.exchange_rate = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_SWEEP_FREQUENCY)? {
            self.sweep.frequency_minutes = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_REQUEST_INTERVAL_MS)? {
            self.sweep.request_interval_ms = v;
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.general.timeout_seconds == 0 || self.general.timeout_seconds > 300 {
            return Err(RelayError::Config(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        ExchangeRate::new(self.billing.exchange_rate)?;

        if self.poll.max_attempts == 0 {
            return Err(RelayError::Config(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.general.timeout_seconds)
    }

    /// The validated exchange rate.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the rate is not positive.
    pub fn exchange_rate(&self) -> Result<ExchangeRate> {
        ExchangeRate::new(self.billing.exchange_rate)
    }

    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll.interval_seconds),
            max_attempts: self.poll.max_attempts,
        }
    }

    #[must_use]
    pub const fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            request_interval: Duration::from_millis(self.sweep.request_interval_ms),
        }
    }

    /// Sweep period, or `None` when the background sweep is off.
    #[must_use]
    pub const fn sweep_frequency(&self) -> Option<Duration> {
        if self.sweep.frequency_minutes == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sweep.frequency_minutes * 60))
        }
    }

    /// Channel records file: configured, else the default data location.
    #[must_use]
    pub fn channels_file(&self) -> PathBuf {
        self.store
            .channels_file
            .clone()
            .unwrap_or_else(|| AppPaths::new().channels_file())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RelayError::Config(format!("{var}={value:?}: {e}"))),
        _ => Ok(None),
    }
}
