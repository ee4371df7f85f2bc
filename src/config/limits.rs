//! Per-session resource limits.

use serde::Deserialize;

use super::defaults::default_send_queue;

/// Per-session resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Outbound frames buffered per session (default: 256).
    /// A session whose queue overflows is closed instead of blocking others.
    #[serde(default = "default_send_queue")]
    pub send_queue: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            send_queue: default_send_queue(),
        }
    }
}
