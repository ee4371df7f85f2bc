//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig) and loading
//! - [`listen`]: Network listener configuration (ListenConfig)
//! - [`limits`]: Per-session limits (LimitsConfig)
//! - [`log`]: Logging configuration (LogConfig)
//! - [`validation`]: Startup validation collecting every error

mod defaults;
mod limits;
mod listen;
mod log;
mod types;
pub mod validation;

pub use defaults::DEFAULT_PORT;
pub use limits::LimitsConfig;
pub use listen::ListenConfig;
pub use log::LogConfig;
pub use types::{Config, ConfigError, ServerConfig};
