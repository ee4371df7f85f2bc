//! Client-side protocol driver.
//!
//! [`Client`] owns one TCP connection to the server. A reader task decodes
//! frames and hands them to a [`ClientHandler`]; a writer task drains an
//! ordered queue through a `FramedWrite`, so requests reach the server in the
//! order they were made.
//!
//! ```ignore
//! let client = Client::connect("127.0.0.1:9000", "alice", handler).await?;
//! client.send_direct_message("bob", "hi").await?;
//! client.request_list().await?;
//! client.disconnect().await?;
//! client.closed().await;
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::codec::ImCodec;
use crate::error::{ProtocolError, Result};
use crate::kind::MessageKind;
use crate::message::{validate_body, validate_nickname, Message};

/// Requests buffered ahead of the socket.
const OUTGOING_QUEUE: usize = 64;

/// Receives everything the server sends to this client.
pub trait ClientHandler: Send + Sync + 'static {
    /// Acknowledgements, refusals and broadcast notices.
    fn on_server_message(&self, text: &str);

    /// Roster of currently registered nicknames.
    fn on_roster(&self, nicknames: Vec<String>);

    /// A direct message from another user.
    fn on_direct_message(&self, from: &str, body: &str);

    /// The connection dropped without a disconnect handshake.
    fn on_connection_lost(&self, error: &ProtocolError) {
        let _ = error;
    }
}

struct ClientState {
    connected: watch::Sender<bool>,
    registered: AtomicBool,
}

impl ClientState {
    /// Mark the client closed. Returns whether it was open.
    fn close(&self) -> bool {
        self.registered.store(false, Ordering::Release);
        self.connected.send_replace(false)
    }
}

/// A connection to the messaging server.
pub struct Client {
    nickname: String,
    outgoing: mpsc::Sender<Message>,
    state: Arc<ClientState>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Client {
    /// Connect to `addr` and request registration as `nickname`.
    ///
    /// Returns once the connect request is queued; the outcome arrives
    /// through [`ClientHandler::on_server_message`] and
    /// [`Client::is_registered`].
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        nickname: &str,
        handler: Arc<dyn ClientHandler>,
    ) -> Result<Self> {
        validate_nickname(nickname)?;
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();

        let (connected, _) = watch::channel(true);
        let state = Arc::new(ClientState {
            connected,
            registered: AtomicBool::new(false),
        });
        let (outgoing, outgoing_rx) = mpsc::channel(OUTGOING_QUEUE);

        let writer = tokio::spawn(write_loop(
            FramedWrite::new(write_half, ImCodec::new()),
            outgoing_rx,
            state.connected.subscribe(),
        ));
        let reader = tokio::spawn(read_loop(
            FramedRead::new(read_half, ImCodec::new()),
            handler,
            Arc::clone(&state),
        ));

        let client = Self {
            nickname: nickname.to_owned(),
            outgoing,
            state,
            reader,
            writer,
        };
        client.enqueue(Message::connect(nickname)).await?;
        Ok(client)
    }

    /// The nickname this client asked to register.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Whether the socket is still open.
    pub fn is_connected(&self) -> bool {
        *self.state.connected.borrow()
    }

    /// Whether the server acknowledged the registration.
    pub fn is_registered(&self) -> bool {
        self.state.registered.load(Ordering::Acquire)
    }

    /// Send `body` to the user registered as `to`.
    pub async fn send_direct_message(&self, to: &str, body: &str) -> Result<()> {
        validate_nickname(to)?;
        validate_body(body)?;
        self.enqueue(Message::direct_message(to, body)).await
    }

    /// Ask for the roster.
    pub async fn request_list(&self) -> Result<()> {
        self.enqueue(Message::list_request()).await
    }

    /// Ask the server to end the session. The socket closes when the
    /// acknowledgement arrives.
    pub async fn disconnect(&self) -> Result<()> {
        self.enqueue(Message::disconnect()).await
    }

    /// Wait until the connection is closed, gracefully or not.
    pub async fn closed(&self) {
        let mut rx = self.state.connected.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    async fn enqueue(&self, msg: Message) -> Result<()> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        self.outgoing
            .send(msg)
            .await
            .map_err(|_| ProtocolError::NotConnected)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn write_loop(
    mut writer: FramedWrite<OwnedWriteHalf, ImCodec>,
    mut outgoing: mpsc::Receiver<Message>,
    mut connected: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            msg = outgoing.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = writer.send(msg).await {
                        debug!(error = %e, "write failed");
                        break;
                    }
                }
                None => break,
            },
            changed = connected.changed() => {
                if changed.is_err() || !*connected.borrow() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut reader: FramedRead<OwnedReadHalf, ImCodec>,
    handler: Arc<dyn ClientHandler>,
    state: Arc<ClientState>,
) {
    while let Some(result) = reader.next().await {
        match result {
            Ok(msg) => {
                if !dispatch(handler.as_ref(), &state, msg) {
                    state.close();
                    return;
                }
            }
            Err(e) => {
                if state.close() {
                    handler.on_connection_lost(&e);
                }
                return;
            }
        }
    }

    if state.close() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "server closed the connection");
        handler.on_connection_lost(&ProtocolError::Io(eof));
    }
}

/// Route one server message. Returns `false` when the session is over.
fn dispatch(handler: &dyn ClientHandler, state: &ClientState, msg: Message) -> bool {
    match msg.kind() {
        MessageKind::ConnectAck => {
            state.registered.store(true, Ordering::Release);
            handler.on_server_message(msg.value());
        }
        MessageKind::ConnectRefused | MessageKind::DisconnectAck => {
            handler.on_server_message(msg.value());
            return false;
        }
        MessageKind::MessageAck | MessageKind::MessageRefused | MessageKind::Broadcast => {
            handler.on_server_message(msg.value());
        }
        MessageKind::DirectMessage => match msg.fields() {
            Some((from, body)) => handler.on_direct_message(from, body),
            None => debug!(value = %msg.value(), "direct message without separator"),
        },
        MessageKind::ListResponse => {
            let nicknames = msg.nicknames().into_iter().map(str::to_owned).collect();
            handler.on_roster(nicknames);
        }
        MessageKind::Connect
        | MessageKind::ListRequest
        | MessageKind::Disconnect => {
            debug!(kind = %msg.kind(), "ignoring server-bound message");
        }
    }
    true
}
