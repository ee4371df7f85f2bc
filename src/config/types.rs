//! Core configuration types and loading.

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use thiserror::Error;

use super::defaults::default_server_name;
use super::limits::LimitsConfig;
use super::listen::ListenConfig;
use super::log::LogConfig;
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server information.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network listen configuration.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Per-session limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        validation::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Default configuration listening on every interface at `port`.
    pub fn for_port(port: u16) -> Self {
        let mut config = Self::default();
        config.listen.address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        config
    }

    /// Resolve the command-line argument: a bare port number, or a config
    /// file path.
    pub fn from_arg(arg: &str) -> Result<Self, ConfigError> {
        match arg.parse::<u16>() {
            Ok(port) => Ok(Self::for_port(port)),
            Err(_) => Self::load(arg),
        }
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}
