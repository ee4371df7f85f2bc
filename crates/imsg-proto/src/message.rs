//! The protocol message and its frame layout.
//!
//! A frame is three fields in sequence:
//!
//! ```text
//! +------+--------+---------------------+
//! | type | length | value               |
//! | 2 B  | 4 B    | `length` bytes      |
//! +------+--------+---------------------+
//! ```
//!
//! `type` and `length` are ASCII decimal, right-aligned and space padded
//! (`" 4"`, `"  12"`). Compound values are split on [`SEPARATOR`], which is
//! never escaped: a nickname or body containing it yields undefined field
//! boundaries.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::kind::MessageKind;

/// Width of the type field.
pub const TYPE_LEN: usize = 2;
/// Width of the length field.
pub const LENGTH_LEN: usize = 4;
/// Width of the whole header.
pub const HEADER_LEN: usize = TYPE_LEN + LENGTH_LEN;
/// Longest nickname accepted for registration or as a destinatary.
pub const MAX_NICKNAME_LEN: usize = 128;
/// Longest direct-message body.
pub const MAX_BODY_LEN: usize = 512;
/// Reserved field separator inside compound values.
pub const SEPARATOR: char = '|';
/// Largest payload a frame may carry.
pub const MAX_VALUE_LEN: usize = MAX_NICKNAME_LEN + SEPARATOR.len_utf8() + MAX_BODY_LEN;

/// A single protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    value: String,
}

impl Message {
    /// Create a message, clamping `value` to [`MAX_VALUE_LEN`] bytes.
    pub fn new(kind: MessageKind, value: impl Into<String>) -> Self {
        let mut value = value.into();
        clamp_value(&mut value);
        Self { kind, value }
    }

    /// Registration request for `nickname`.
    pub fn connect(nickname: &str) -> Self {
        Self::new(MessageKind::Connect, nickname)
    }

    /// Registration accepted.
    pub fn connect_ack(text: impl Into<String>) -> Self {
        Self::new(MessageKind::ConnectAck, text)
    }

    /// Registration refused.
    pub fn connect_refused(text: impl Into<String>) -> Self {
        Self::new(MessageKind::ConnectRefused, text)
    }

    /// Direct message. `peer` is the destinatary when sent by a client and
    /// the originator when relayed by the server.
    pub fn direct_message(peer: &str, body: &str) -> Self {
        let mut value = String::with_capacity(peer.len() + SEPARATOR.len_utf8() + body.len());
        value.push_str(peer);
        value.push(SEPARATOR);
        value.push_str(body);
        Self::new(MessageKind::DirectMessage, value)
    }

    /// Direct message delivered.
    pub fn message_ack(text: impl Into<String>) -> Self {
        Self::new(MessageKind::MessageAck, text)
    }

    /// Direct message refused.
    pub fn message_refused(text: impl Into<String>) -> Self {
        Self::new(MessageKind::MessageRefused, text)
    }

    /// Roster request.
    pub fn list_request() -> Self {
        Self::new(MessageKind::ListRequest, String::new())
    }

    /// Roster response.
    ///
    /// Nicknames are joined with [`SEPARATOR`]. Once the next entry would
    /// push the payload past [`MAX_VALUE_LEN`] it and every later entry are
    /// dropped, so very large rosters arrive incomplete.
    pub fn list_response<S: AsRef<str>>(nicknames: &[S]) -> Self {
        let mut value = String::new();
        for nickname in nicknames {
            let nickname = nickname.as_ref();
            let needed = if value.is_empty() {
                nickname.len()
            } else {
                nickname.len() + SEPARATOR.len_utf8()
            };
            if value.len() + needed > MAX_VALUE_LEN {
                break;
            }
            if !value.is_empty() {
                value.push(SEPARATOR);
            }
            value.push_str(nickname);
        }
        Self::new(MessageKind::ListResponse, value)
    }

    /// Leave request.
    pub fn disconnect() -> Self {
        Self::new(MessageKind::Disconnect, String::new())
    }

    /// Leave acknowledged.
    pub fn disconnect_ack(text: impl Into<String>) -> Self {
        Self::new(MessageKind::DisconnectAck, text)
    }

    /// Server notice for every registered client but the originator.
    pub fn broadcast(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Broadcast, text)
    }

    /// The message kind.
    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The raw payload.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume the message, returning its payload.
    pub fn into_value(self) -> String {
        self.value
    }

    /// Total bytes this message occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.value.len()
    }

    /// Split a direct-message value into `(peer, body)` at the first separator.
    pub fn fields(&self) -> Option<(&str, &str)> {
        self.value.split_once(SEPARATOR)
    }

    /// First field of a direct message: the destinatary on the way in, the
    /// originator on the way out.
    pub fn destinatary(&self) -> Option<&str> {
        self.fields().map(|(peer, _)| peer)
    }

    /// Second field of a direct message.
    pub fn body(&self) -> Option<&str> {
        self.fields().map(|(_, body)| body)
    }

    /// Nicknames carried by a roster response. An empty value is an empty roster.
    pub fn nicknames(&self) -> Vec<&str> {
        if self.value.is_empty() {
            return Vec::new();
        }
        self.value.split(SEPARATOR).collect()
    }

    /// Append the encoded frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(&encode_type(self.kind));
        dst.put_slice(&encode_length(self.value.len()));
        dst.put_slice(self.value.as_bytes());
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode exactly one complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::FrameSize {
                expected: HEADER_LEN,
                actual: frame.len(),
            });
        }
        let kind = decode_type(&frame[..TYPE_LEN])?;
        let len = decode_length(&frame[TYPE_LEN..HEADER_LEN])?;
        if frame.len() != HEADER_LEN + len {
            return Err(ProtocolError::FrameSize {
                expected: HEADER_LEN + len,
                actual: frame.len(),
            });
        }
        let value = decode_value(&frame[HEADER_LEN..])?;
        Ok(Self { kind, value })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.value)
    }
}

/// Render the type field.
pub fn encode_type(kind: MessageKind) -> [u8; TYPE_LEN] {
    render_field(usize::from(kind.code()))
}

/// Render the length field. `len` must already be clamped to [`MAX_VALUE_LEN`].
pub fn encode_length(len: usize) -> [u8; LENGTH_LEN] {
    debug_assert!(len <= MAX_VALUE_LEN, "value length must be clamped before encoding");
    render_field(len)
}

/// Parse the type field.
pub fn decode_type(field: &[u8]) -> Result<MessageKind> {
    parse_field(field)
        .and_then(|code| u8::try_from(code).ok())
        .and_then(MessageKind::from_code)
        .ok_or_else(|| ProtocolError::UnknownType {
            raw: String::from_utf8_lossy(field).into_owned(),
        })
}

/// Parse the length field, rejecting anything above [`MAX_VALUE_LEN`].
pub fn decode_length(field: &[u8]) -> Result<usize> {
    let declared = parse_field(field).ok_or_else(|| ProtocolError::MalformedLength {
        raw: String::from_utf8_lossy(field).into_owned(),
    })?;
    if declared > MAX_VALUE_LEN {
        return Err(ProtocolError::LengthOverflow {
            declared,
            limit: MAX_VALUE_LEN,
        });
    }
    Ok(declared)
}

/// Validate payload bytes as UTF-8.
pub fn decode_value(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_owned()),
        Err(e) => Err(ProtocolError::InvalidUtf8 {
            byte_pos: e.valid_up_to(),
        }),
    }
}

/// Check a nickname before it is registered or addressed.
pub fn validate_nickname(nickname: &str) -> Result<()> {
    let reason = if nickname.is_empty() {
        "empty nicknames are not allowed"
    } else if nickname.len() > MAX_NICKNAME_LEN {
        "longer than 128 bytes"
    } else if nickname.contains(SEPARATOR) {
        "contains the reserved separator"
    } else {
        return Ok(());
    };
    Err(ProtocolError::InvalidNickname {
        nickname: nickname.to_owned(),
        reason,
    })
}

/// Check a direct-message body before it is sent.
pub fn validate_body(body: &str) -> Result<()> {
    if body.len() > MAX_BODY_LEN {
        return Err(ProtocolError::BodyTooLong {
            actual: body.len(),
            limit: MAX_BODY_LEN,
        });
    }
    Ok(())
}

fn clamp_value(value: &mut String) {
    if value.len() <= MAX_VALUE_LEN {
        return;
    }
    let mut end = MAX_VALUE_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}

fn render_field<const N: usize>(mut n: usize) -> [u8; N] {
    let mut out = [b' '; N];
    let mut i = N;
    loop {
        i -= 1;
        out[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 || i == 0 {
            break;
        }
    }
    debug_assert_eq!(n, 0, "numeric field overflow");
    out
}

fn parse_field(field: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(field).ok()?.trim_matches(' ');
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_are_space_padded() {
        assert_eq!(&encode_type(MessageKind::DirectMessage), b" 4");
        assert_eq!(&encode_type(MessageKind::Broadcast), b"11");
        assert_eq!(&encode_length(0), b"   0");
        assert_eq!(&encode_length(641), b" 641");
    }

    #[test]
    fn test_decode_type_accepts_padding() {
        assert_eq!(decode_type(b" 1").unwrap(), MessageKind::Connect);
        assert_eq!(decode_type(b"01").unwrap(), MessageKind::Connect);
        assert_eq!(decode_type(b"10").unwrap(), MessageKind::DisconnectAck);
    }

    #[test]
    fn test_decode_type_rejects_unknown() {
        for raw in [&b" 0"[..], b"12", b"99", b"  ", b"x1", b"-1"] {
            let err = decode_type(raw).unwrap_err();
            assert!(matches!(err, ProtocolError::UnknownType { .. }), "{raw:?}");
        }
    }

    #[test]
    fn test_decode_length_limits() {
        assert_eq!(decode_length(b"   0").unwrap(), 0);
        assert_eq!(decode_length(b" 641").unwrap(), MAX_VALUE_LEN);
        assert!(matches!(
            decode_length(b" 642"),
            Err(ProtocolError::LengthOverflow { declared: 642, .. })
        ));
        assert!(matches!(
            decode_length(b"abcd"),
            Err(ProtocolError::MalformedLength { .. })
        ));
    }

    #[test]
    fn test_direct_message_fields() {
        let msg = Message::direct_message("bob", "hi there");
        assert_eq!(msg.value(), "bob|hi there");
        assert_eq!(msg.destinatary(), Some("bob"));
        assert_eq!(msg.body(), Some("hi there"));
    }

    #[test]
    fn test_direct_message_without_separator() {
        let msg = Message::new(MessageKind::DirectMessage, "bob");
        assert_eq!(msg.fields(), None);
    }

    #[test]
    fn test_list_response_roundtrip_fields() {
        let msg = Message::list_response(&["alice", "bob", "carol"]);
        assert_eq!(msg.value(), "alice|bob|carol");
        assert_eq!(msg.nicknames(), vec!["alice", "bob", "carol"]);
        assert!(Message::list_response::<&str>(&[]).nicknames().is_empty());
    }

    #[test]
    fn test_list_response_truncates_large_roster() {
        let nicknames: Vec<String> = (0..100).map(|i| format!("user{i:04}")).collect();
        let msg = Message::list_response(&nicknames);
        assert!(msg.value().len() <= MAX_VALUE_LEN);
        let got = msg.nicknames();
        assert!(got.len() < nicknames.len());
        assert_eq!(got, nicknames[..got.len()].iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_value_is_clamped_on_char_boundary() {
        let long = "é".repeat(MAX_VALUE_LEN);
        let msg = Message::broadcast(long);
        assert!(msg.value().len() <= MAX_VALUE_LEN);
        assert!(msg.value().len() >= MAX_VALUE_LEN - 1);
        let frame = msg.to_bytes();
        assert_eq!(Message::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn test_encode_layout() {
        let frame = Message::connect("alice").to_bytes();
        assert_eq!(&frame[..], b" 1   5alice");
        let frame = Message::list_request().to_bytes();
        assert_eq!(&frame[..], b" 7   0");
    }

    #[test]
    fn test_decode_rejects_size_mismatch() {
        assert!(matches!(
            Message::decode(b" 1   5ali"),
            Err(ProtocolError::FrameSize { expected: 11, actual: 9 })
        ));
        assert!(matches!(
            Message::decode(b" 1"),
            Err(ProtocolError::FrameSize { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = Message::decode(b" 4   2\xff\xfe").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8 { byte_pos: 0 }));
    }

    #[test]
    fn test_validate_nickname() {
        assert!(validate_nickname("alice").is_ok());
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("a|b").is_err());
        assert!(validate_nickname(&"x".repeat(MAX_NICKNAME_LEN)).is_ok());
        assert!(validate_nickname(&"x".repeat(MAX_NICKNAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_body() {
        assert!(validate_body(&"x".repeat(MAX_BODY_LEN)).is_ok());
        assert!(matches!(
            validate_body(&"x".repeat(MAX_BODY_LEN + 1)),
            Err(ProtocolError::BodyTooLong { actual: 513, limit: 512 })
        ));
    }
}
