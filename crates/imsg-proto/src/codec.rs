//! Frame codec for tokio.
//!
//! The decoder is the per-connection read state machine:
//!
//! ```text
//!   ┌──────────────┐  2 bytes   ┌────────────────┐  4 bytes   ┌───────────────┐
//!   │ ReadingType  │──────────▶│ ReadingLength  │──────────▶│ ReadingValue  │
//!   └──────────────┘            └────────────────┘            └───────────────┘
//!          ▲                         │ length == 0                   │ n bytes
//!          └─────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Zero-length payloads (acks without text, requests) are yielded straight
//! from `ReadingLength` without waiting for a value. A bad type or length
//! field is returned as an error and the stream must be abandoned.

use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::kind::MessageKind;
use crate::message::{
    decode_length, decode_type, decode_value, Message, HEADER_LEN, LENGTH_LEN, TYPE_LEN,
};

/// Where the decoder is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// Waiting for the type field.
    #[default]
    ReadingType,
    /// Type decoded, waiting for the length field.
    ReadingLength(MessageKind),
    /// Header decoded, waiting for `len` payload bytes.
    ReadingValue {
        /// Kind of the pending message.
        kind: MessageKind,
        /// Payload bytes still expected.
        len: usize,
    },
}

/// Tokio codec for encoding/decoding protocol [`Message`]s.
#[derive(Debug, Default)]
pub struct ImCodec {
    state: ReadState,
}

impl ImCodec {
    /// Create a codec positioned at the start of a frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current read state.
    pub fn state(&self) -> ReadState {
        self.state
    }
}

impl Decoder for ImCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        loop {
            match self.state {
                ReadState::ReadingType => {
                    if src.len() < TYPE_LEN {
                        src.reserve(HEADER_LEN);
                        return Ok(None);
                    }
                    let field = src.split_to(TYPE_LEN);
                    let kind = decode_type(&field)?;
                    self.state = ReadState::ReadingLength(kind);
                }
                ReadState::ReadingLength(kind) => {
                    if src.len() < LENGTH_LEN {
                        return Ok(None);
                    }
                    let field = src.split_to(LENGTH_LEN);
                    let len = match decode_length(&field) {
                        Ok(len) => len,
                        Err(e) => {
                            self.state = ReadState::ReadingType;
                            return Err(e);
                        }
                    };
                    if len == 0 {
                        self.state = ReadState::ReadingType;
                        return Ok(Some(Message::new(kind, String::new())));
                    }
                    self.state = ReadState::ReadingValue { kind, len };
                }
                ReadState::ReadingValue { kind, len } => {
                    if src.len() < len {
                        src.reserve(len - src.len());
                        return Ok(None);
                    }
                    let bytes = src.split_to(len);
                    self.state = ReadState::ReadingType;
                    let value = decode_value(&bytes)?;
                    return Ok(Some(Message::new(kind, value)));
                }
            }
        }
    }
}

impl Encoder<Message> for ImCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        msg.encode(dst);
        Ok(())
    }
}

impl Encoder<Arc<Message>> for ImCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Arc<Message>, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        msg.encode(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(codec: &mut ImCodec, buf: &mut BytesMut, bytes: &[u8]) -> Vec<Message> {
        buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(msg) = codec.decode(buf).unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_state_progression_byte_by_byte() {
        let mut codec = ImCodec::new();
        let mut buf = BytesMut::new();
        let frame = Message::connect("bob").to_bytes();

        assert!(feed(&mut codec, &mut buf, &frame[..1]).is_empty());
        assert_eq!(codec.state(), ReadState::ReadingType);

        assert!(feed(&mut codec, &mut buf, &frame[1..2]).is_empty());
        assert_eq!(codec.state(), ReadState::ReadingLength(MessageKind::Connect));

        assert!(feed(&mut codec, &mut buf, &frame[2..6]).is_empty());
        assert_eq!(
            codec.state(),
            ReadState::ReadingValue {
                kind: MessageKind::Connect,
                len: 3
            }
        );

        let got = feed(&mut codec, &mut buf, &frame[6..]);
        assert_eq!(got, vec![Message::connect("bob")]);
        assert_eq!(codec.state(), ReadState::ReadingType);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_zero_length_skips_value_read() {
        let mut codec = ImCodec::new();
        let mut buf = BytesMut::new();
        let got = feed(&mut codec, &mut buf, &Message::list_request().to_bytes());
        assert_eq!(got, vec![Message::list_request()]);
        assert_eq!(codec.state(), ReadState::ReadingType);
    }

    #[test]
    fn test_several_frames_in_one_read() {
        let mut codec = ImCodec::new();
        let mut buf = BytesMut::new();
        let mut wire = BytesMut::new();
        Message::connect("alice").encode(&mut wire);
        Message::list_request().encode(&mut wire);
        Message::direct_message("bob", "hi").encode(&mut wire);

        let got = feed(&mut codec, &mut buf, &wire);
        assert_eq!(
            got,
            vec![
                Message::connect("alice"),
                Message::list_request(),
                Message::direct_message("bob", "hi"),
            ]
        );
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let mut codec = ImCodec::new();
        let mut buf = BytesMut::from(&b"99   0"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType { .. }));
    }

    #[test]
    fn test_length_overflow_resets_state() {
        let mut codec = ImCodec::new();
        let mut buf = BytesMut::from(&b" 49999"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::LengthOverflow { declared: 9999, .. }
        ));
        assert_eq!(codec.state(), ReadState::ReadingType);
    }

    #[test]
    fn test_encoder_matches_message_encode() {
        let mut codec = ImCodec::new();
        let mut dst = BytesMut::new();
        let msg = Message::broadcast("alice has logged in.");
        codec.encode(msg.clone(), &mut dst).unwrap();
        codec.encode(Arc::new(msg.clone()), &mut dst).unwrap();
        let mut expected = BytesMut::new();
        msg.encode(&mut expected);
        msg.encode(&mut expected);
        assert_eq!(dst, expected);
    }
}
