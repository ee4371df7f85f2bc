//! Logging setup and standard spans.
//!
//! [`init`] installs the global `tracing` subscriber once at startup. Output
//! always goes to stdout; with `log.file` set it is also written to a file by
//! `tracing-appender`'s background worker. The returned [`WorkerGuard`] must
//! be held until exit so buffered lines are flushed.

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LogConfig;

/// Build the filter: `RUST_LOG` if set, otherwise the configured level.
pub fn env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level '{}'", config.level)),
    }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;

    let (file_writer, guard) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    if config.json {
        let file_layer = file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .with(file_layer)
            .try_init()?;
    } else {
        let file_layer = file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .with(file_layer)
            .try_init()?;
    }

    Ok(guard)
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for a whole server run.
    pub fn server(name: &str) -> Span {
        info_span!("server", name = %name)
    }

    /// Span for a terminal client run.
    pub fn client(addr: &str) -> Span {
        info_span!("client", addr = %addr)
    }
}
