//! # imsg-proto
//!
//! Wire protocol for the imsgd instant-messaging service.
//!
//! ## Features
//!
//! - Typed [`Message`] with one builder per [`MessageKind`]
//! - Exact frame encoding/decoding with strict type and length validation
//! - Optional Tokio integration: [`ImCodec`] for `tokio-util` framing and a
//!   [`Client`](client::Client) driver
//!
//! ## Quick Start
//!
//! ```rust
//! use imsg_proto::{Message, MessageKind};
//!
//! let msg = Message::direct_message("bob", "hi");
//! let frame = msg.to_bytes();
//! assert_eq!(&frame[..], b" 4   6bob|hi");
//!
//! let decoded = Message::decode(&frame).unwrap();
//! assert_eq!(decoded.kind(), MessageKind::DirectMessage);
//! assert_eq!(decoded.destinatary(), Some("bob"));
//! assert_eq!(decoded.body(), Some("hi"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod codec;
pub mod error;
pub mod kind;
pub mod message;

#[cfg(feature = "tokio")]
pub use self::codec::{ImCodec, ReadState};
pub use self::error::{ProtocolError, Result};
pub use self::kind::{MessageKind, AFTER_LAST};
pub use self::message::{
    decode_length, decode_type, encode_length, encode_type, validate_body, validate_nickname,
    Message, HEADER_LEN, LENGTH_LEN, MAX_BODY_LEN, MAX_NICKNAME_LEN, MAX_VALUE_LEN, SEPARATOR,
    TYPE_LEN,
};
