//! Server configuration loading from file and environment variables.

use crate::hub::DEFAULT_SESSION_BUFFER;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Fan-out settings.
    #[serde(default)]
    pub hub: HubConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Frames queued per subscriber before new frames are dropped for it.
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,

    /// Largest accepted `POST /api/activity` body.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "pulse_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_session_buffer() -> usize {
    DEFAULT_SESSION_BUFFER
}

fn default_max_payload_bytes() -> usize {
    64 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            session_buffer: default_session_buffer(),
            max_payload_bytes: default_max_payload_bytes(),
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

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PULSE_HOST` overrides `server.host`
/// - `PULSE_PORT` overrides `server.port`
/// - `PULSE_LOG_LEVEL` overrides `logging.level`
/// - `PULSE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
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

    Ok(apply_env_overrides(config, |var| std::env::var(var).ok()))
}

fn apply_env_overrides(mut config: Config, env: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(host) = env("PULSE_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring unparseable PULSE_HOST"),
        }
    }
    if let Some(port) = env("PULSE_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring unparseable PULSE_PORT"),
        }
    }
    if let Some(level) = env("PULSE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("PULSE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    config
}
