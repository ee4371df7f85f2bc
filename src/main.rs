//! imsgd - Instant-messaging server.
//!
//! Usage: `imsgd [config.toml | <port>]`

use std::sync::Arc;
use std::time::Duration;

use imsgd::telemetry;
use imsgd::{Config, Gateway, SessionManager};
use tracing::{Instrument, error, info};

/// How long shutdown waits for sessions to finish tearing down.
const SHUTDOWN_POLLS: u32 = 50;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::from_arg(&arg).map_err(|e| {
        eprintln!("imsgd: failed to load config {arg}: {e}");
        e
    })?;

    // Initialize tracing; the guard flushes the log file when main returns.
    let _log_guard = telemetry::init(&config.log)?;

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        send_queue = config.limits.send_queue,
        "Starting imsgd"
    );

    let manager = Arc::new(SessionManager::new(config.limits.send_queue));
    let gateway = Gateway::bind(config.listen.address, Arc::clone(&manager))
        .await
        .map_err(|e| {
            error!(addr = %config.listen.address, error = %e, "Failed to bind");
            e
        })?;

    let span = telemetry::spans::server(&config.server.name);
    tokio::select! {
        result = gateway.run().instrument(span) => {
            if let Err(e) = result {
                error!(error = %e, "Gateway stopped");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    manager.shutdown();
    for _ in 0..SHUTDOWN_POLLS {
        if manager.session_count() == 0 {
            break;
        }
        tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
    info!(
        sessions = manager.session_count(),
        users = manager.user_count(),
        "imsgd stopped"
    );
    Ok(())
}
