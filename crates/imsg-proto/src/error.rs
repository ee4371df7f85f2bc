//! Error types for the instant-messaging protocol.
//!
//! Frame-level failures (bad type code, oversized or non-numeric length,
//! invalid UTF-8) make a connection unrecoverable. Field validation
//! failures are raised before anything reaches the wire.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The type field did not name a known message kind.
    #[error("unknown message type: {raw:?}")]
    UnknownType {
        /// The raw type field as received.
        raw: String,
    },

    /// The length field was not a number.
    #[error("malformed length field: {raw:?}")]
    MalformedLength {
        /// The raw length field as received.
        raw: String,
    },

    /// The declared payload length exceeds the protocol maximum.
    #[error("payload length {declared} exceeds limit {limit}")]
    LengthOverflow {
        /// Length declared by the frame header.
        declared: usize,
        /// Maximum payload length.
        limit: usize,
    },

    /// The payload was not valid UTF-8.
    #[error("invalid UTF-8 in payload at byte {byte_pos}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
    },

    /// A whole-frame decode was handed the wrong number of bytes.
    #[error("frame is {actual} bytes, header declares {expected}")]
    FrameSize {
        /// Bytes implied by the header.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// Nickname rejected by [`validate_nickname`](crate::validate_nickname).
    #[error("invalid nickname {nickname:?}: {reason}")]
    InvalidNickname {
        /// The rejected nickname.
        nickname: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Message body longer than [`MAX_BODY_LEN`](crate::MAX_BODY_LEN).
    #[error("message body too long: {actual} bytes (limit: {limit})")]
    BodyTooLong {
        /// Actual body length.
        actual: usize,
        /// Maximum body length.
        limit: usize,
    },

    /// The client is not connected to a server.
    #[error("not connected")]
    NotConnected,
}

impl ProtocolError {
    /// Whether this error means the byte stream can no longer be trusted.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownType { .. }
                | Self::MalformedLength { .. }
                | Self::LengthOverflow { .. }
                | Self::InvalidUtf8 { .. }
                | Self::FrameSize { .. }
        )
    }
}
