//! imsgd - Instant-messaging server.
//!
//! Clients connect over TCP, register a unique nickname, exchange direct
//! messages, ask for the roster and receive a notice whenever someone logs
//! in or out. The wire format lives in the `imsg-proto` crate.
//!
//! ```text
//!   Gateway ──accept──▶ Session (per socket) ──on_message──▶ SessionManager
//!                          ▲                                   │ handlers
//!                          └────── outbound queue ◀── TopicRouter
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod network;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use network::{Gateway, Session};
pub use state::SessionManager;
