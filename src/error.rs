//! Unified error handling for imsgd.
//!
//! Each layer has its own error enum with a static `error_code()` used as a
//! structured logging label. Only transport and framing failures ever close a
//! session; registry failures become refusal replies.

use imsg_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Session Errors (transport and framing)
// ============================================================================

/// Reasons a session stopped reading.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed frame: {0}")]
    Frame(ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    #[error("connection closed by peer")]
    PeerClosed,

    #[error("send queue exceeded")]
    SendQueueExceeded,
}

impl SessionError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Frame(_) => "malformed_frame",
            Self::Transport(_) => "transport_error",
            Self::PeerClosed => "peer_closed",
            Self::SendQueueExceeded => "send_queue_exceeded",
        }
    }
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::Transport(e),
            other => Self::Frame(other),
        }
    }
}

// ============================================================================
// Registry Errors (nickname bookkeeping)
// ============================================================================

/// Nickname registration failures. Always answered with `connect-refused`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("invalid nickname: {0}")]
    InvalidNickname(String),
}

impl RegistryError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::InvalidNickname(_) => "invalid_nickname",
        }
    }
}

// ============================================================================
// Delivery Errors (outbound queue)
// ============================================================================

/// Failure to hand a message to a session's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("send queue full")]
    QueueFull,

    #[error("session closed")]
    Closed,
}

impl DeliveryError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
        }
    }
}
