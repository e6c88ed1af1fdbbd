//! Client configuration loading from file and environment variables.

use crate::connection::{
    ConnectionConfig, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP, DEFAULT_MAX_RECONNECT_ATTEMPTS,
};
use crate::event_log::DEFAULT_EVENT_LOG_CAPACITY;
use pulse_chaos::{ChaosConfig, DEFAULT_BASELINE, DEFAULT_DECAY_AMOUNT, DEFAULT_DECAY_INTERVAL};
use pulse_effects::{SchedulerConfig, DEFAULT_COOLDOWN, DEFAULT_DEDUP_WINDOW};
use pulse_presence::{RegistryConfig, DEFAULT_AWAY_AFTER, DEFAULT_SWEEP_INTERVAL};
use pulse_types::{TransportMode, DEFAULT_SLOT_COUNT};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub presence: PresenceSection,

    #[serde(default)]
    pub animation: AnimationSection,

    #[serde(default)]
    pub chaos: ChaosSection,

    #[serde(default)]
    pub event_log: EventLogSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    /// Relay endpoint. Absent keeps the client offline.
    pub url: Option<String>,

    /// `websocket` or `sse`.
    pub mode: TransportMode,

    pub max_reconnect_attempts: u32,

    pub backoff_base_ms: u64,

    pub backoff_cap_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenceSection {
    pub slot_count: usize,
    pub away_after_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationSection {
    pub cooldown_ms: u64,
    pub dedup_window_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChaosSection {
    pub baseline: f64,
    pub decay_amount: f64,
    pub decay_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventLogSection {
    pub capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "pulse_client=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: None,
            mode: TransportMode::default(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_base_ms: millis(DEFAULT_BACKOFF_BASE),
            backoff_cap_ms: millis(DEFAULT_BACKOFF_CAP),
        }
    }
}

impl Default for PresenceSection {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            away_after_secs: DEFAULT_AWAY_AFTER.as_secs(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl Default for AnimationSection {
    fn default() -> Self {
        Self {
            cooldown_ms: millis(DEFAULT_COOLDOWN),
            dedup_window_ms: millis(DEFAULT_DEDUP_WINDOW),
        }
    }
}

impl Default for ChaosSection {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE,
            decay_amount: DEFAULT_DECAY_AMOUNT,
            decay_interval_secs: DEFAULT_DECAY_INTERVAL.as_secs(),
        }
    }
}

impl Default for EventLogSection {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    pub fn connection(&self) -> ConnectionConfig {
        let section = &self.connection;
        ConnectionConfig {
            url: section.url.clone().filter(|url| !url.trim().is_empty()),
            mode: section.mode,
            max_reconnect_attempts: section.max_reconnect_attempts,
            backoff_base: Duration::from_millis(section.backoff_base_ms),
            backoff_cap: Duration::from_millis(section.backoff_cap_ms),
            ..ConnectionConfig::default()
        }
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            slot_count: self.presence.slot_count,
            away_after: Duration::from_secs(self.presence.away_after_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.presence.sweep_interval_secs)
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            cooldown: Duration::from_millis(self.animation.cooldown_ms),
            dedup_window: Duration::from_millis(self.animation.dedup_window_ms),
        }
    }

    pub fn chaos(&self) -> ChaosConfig {
        ChaosConfig {
            baseline: self.chaos.baseline,
            decay_amount: self.chaos.decay_amount,
            decay_interval: Duration::from_secs(self.chaos.decay_interval_secs),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override held an unusable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PULSE_URL` overrides `connection.url`
/// - `PULSE_MODE` overrides `connection.mode` (`websocket` or `sse`)
/// - `PULSE_MAX_RECONNECT_ATTEMPTS` overrides `connection.max_reconnect_attempts`
/// - `PULSE_LOG_LEVEL` overrides `logging.level`
/// - `PULSE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if an override cannot be parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(config, |var| std::env::var(var).ok())
}

fn apply_env_overrides(
    mut config: Config,
    env: impl Fn(&'static str) -> Option<String>,
) -> Result<Config, ConfigError> {
    if let Some(url) = env("PULSE_URL") {
        config.connection.url = Some(url);
    }
    if let Some(mode) = env("PULSE_MODE") {
        config.connection.mode = mode.parse().map_err(|_| ConfigError::InvalidEnv {
            var: "PULSE_MODE",
            value: mode.clone(),
        })?;
    }
    if let Some(attempts) = env("PULSE_MAX_RECONNECT_ATTEMPTS") {
        config.connection.max_reconnect_attempts =
            attempts.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PULSE_MAX_RECONNECT_ATTEMPTS",
                value: attempts.clone(),
            })?;
    }
    if let Some(level) = env("PULSE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("PULSE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
