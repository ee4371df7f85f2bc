//! Logging configuration.

use serde::Deserialize;
use std::path::PathBuf;

use super::defaults::default_log_level;

/// Logging configuration.
///
/// `RUST_LOG`, when set, overrides `level`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive (e.g., "info" or "imsgd=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write logs to this file through a background writer.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}
