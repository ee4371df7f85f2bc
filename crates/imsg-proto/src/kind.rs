//! Message kinds and their numeric wire codes.

use std::fmt;

/// One past the highest valid type code.
pub const AFTER_LAST: u8 = 12;

/// The kind of a protocol message.
///
/// Server and client share the same enumeration; each side only acts on the
/// half addressed to it (see [`MessageKind::is_server_bound`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Client asks to register a nickname.
    Connect = 1,
    /// Registration accepted.
    ConnectAck = 2,
    /// Registration refused (nickname taken or invalid).
    ConnectRefused = 3,
    /// Direct message. Client to server: `destinatary|body`.
    /// Server to client: `originator|body`.
    DirectMessage = 4,
    /// Direct message delivered.
    MessageAck = 5,
    /// Direct message refused (unknown destinatary).
    MessageRefused = 6,
    /// Client asks for the roster.
    ListRequest = 7,
    /// Roster: nicknames joined by the separator.
    ListResponse = 8,
    /// Client asks to leave.
    Disconnect = 9,
    /// Leave acknowledged; the client closes the socket.
    DisconnectAck = 10,
    /// Server notice delivered to every registered client but the originator.
    Broadcast = 11,
}

impl MessageKind {
    /// All kinds in code order.
    pub const ALL: [MessageKind; 11] = [
        Self::Connect,
        Self::ConnectAck,
        Self::ConnectRefused,
        Self::DirectMessage,
        Self::MessageAck,
        Self::MessageRefused,
        Self::ListRequest,
        Self::ListResponse,
        Self::Disconnect,
        Self::DisconnectAck,
        Self::Broadcast,
    ];

    /// Look up a kind by its wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        if code == 0 || code >= AFTER_LAST {
            return None;
        }
        Some(Self::ALL[usize::from(code - 1)])
    }

    /// The wire code of this kind.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Protocol name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::ConnectAck => "connect-ack",
            Self::ConnectRefused => "connect-refused",
            Self::DirectMessage => "direct-message",
            Self::MessageAck => "message-ack",
            Self::MessageRefused => "message-refused",
            Self::ListRequest => "list-request",
            Self::ListResponse => "list-response",
            Self::Disconnect => "disconnect",
            Self::DisconnectAck => "disconnect-ack",
            Self::Broadcast => "broadcast",
        }
    }

    /// Whether a server is expected to receive this kind.
    ///
    /// Direct messages travel in both directions.
    pub fn is_server_bound(self) -> bool {
        matches!(
            self,
            Self::Connect | Self::DirectMessage | Self::ListRequest | Self::Disconnect
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}
