//! Session - Handles an individual client connection.
//!
//! Each Session runs in its own Tokio task:
//!
//! ```text
//!    ┌──────────────────────────────────────────────────┐
//!    │                  Session Task                    │
//!    │                                                  │
//!    │  ┌──────────────────┐      ┌──────────────────┐  │
//!    │  │ FramedRead       │      │   FramedWrite    │  │
//!    │  │ (ImCodec states) │      │ (one frame at a  │  │
//!    │  └────────┬─────────┘      │  time, in order) │  │
//!    │           │                └────────▲─────────┘  │
//!    │           ▼                         │            │
//!    │    tokio::select! ◄──── close ──────┼────────┐   │
//!    │           │                         │        │   │
//!    │           ▼                         │        │   │
//!    │   [SessionObserver] ──────▶ [Outgoing Queue] │   │
//!    └──────────────────────────────────────────────────┘
//! ```
//!
//! The read loop and the write loop run side by side in the one task, so a
//! slow peer stalls neither the other loop nor a close request. Each loop
//! handles one frame at a time. Failures are reported to the observer once;
//! `on_closed` always fires when the task ends.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use imsg_proto::{ImCodec, Message};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, trace};

use crate::error::SessionError;
use crate::state::{SessionHandle, SessionId, SessionObserver};

/// How long a closing session keeps trying to write queued replies.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A client connection.
pub struct Session {
    handle: SessionHandle,
    stream: TcpStream,
    outgoing_rx: mpsc::Receiver<Arc<Message>>,
    observer: Arc<dyn SessionObserver>,
}

impl Session {
    /// Create a session; nothing is read until [`run`](Self::run).
    pub fn new(
        id: SessionId,
        stream: TcpStream,
        addr: SocketAddr,
        send_queue: usize,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (handle, outgoing_rx) = SessionHandle::new(id, addr, send_queue);
        Self {
            handle,
            stream,
            outgoing_rx,
            observer,
        }
    }

    /// Handle other components use to reach this session.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Run the read and write loops until the connection ends.
    #[instrument(skip(self), fields(session = %self.handle.id(), addr = %self.handle.addr()), name = "session")]
    pub async fn run(self) {
        let Self {
            handle,
            stream,
            mut outgoing_rx,
            observer,
        } = self;

        info!("Client connected");

        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedRead::new(read_half, ImCodec::new());
        let mut writer = FramedWrite::new(write_half, ImCodec::new());

        // A peer that stops reading blocks only the write loop: frames are
        // still read, and a close request still ends the session.
        let exit = tokio::select! {
            biased;

            _ = handle.close_requested() => Exit::CloseRequested,
            error = write_loop(&mut writer, &mut outgoing_rx) => Exit::WriteFailed(error),
            error = read_loop(&mut reader, &handle, observer.as_ref()) => Exit::ReadEnded(error),
        };

        match exit {
            Exit::CloseRequested => debug!("Close requested"),
            Exit::WriteFailed(error) => report(&handle, observer.as_ref(), error),
            Exit::ReadEnded(error) => {
                // Replies to the last frames read still go out.
                flush_pending(&mut writer, &mut outgoing_rx).await;
                report(&handle, observer.as_ref(), error);
            }
        }

        handle.mark_disconnected();
        observer.on_closed(&handle);
        info!("Client disconnected");
    }
}

/// Why the session task stopped.
enum Exit {
    CloseRequested,
    WriteFailed(SessionError),
    ReadEnded(SessionError),
}

/// Decode frames and hand them to the observer until the stream fails.
async fn read_loop(
    reader: &mut FramedRead<OwnedReadHalf, ImCodec>,
    handle: &SessionHandle,
    observer: &dyn SessionObserver,
) -> SessionError {
    loop {
        match reader.next().await {
            Some(Ok(msg)) => {
                if handle.is_connected() {
                    trace!(kind = %msg.kind(), len = msg.value().len(), "Received");
                    observer.on_message(handle, msg);
                } else {
                    debug!(kind = %msg.kind(), "Ignoring frame after disconnect");
                }
            }
            Some(Err(e)) => return SessionError::from(e),
            None => return SessionError::PeerClosed,
        }
    }
}

/// Write queued frames one at a time, in order, until a write fails.
async fn write_loop(
    writer: &mut FramedWrite<OwnedWriteHalf, ImCodec>,
    outgoing_rx: &mut mpsc::Receiver<Arc<Message>>,
) -> SessionError {
    while let Some(msg) = outgoing_rx.recv().await {
        trace!(kind = %msg.kind(), len = msg.value().len(), "Sending");
        if let Err(e) = writer.send(msg).await {
            return SessionError::from(e);
        }
    }
    // The handle holds a sender for as long as the session exists.
    std::future::pending().await
}

/// Best-effort write of whatever is still queued, bounded by [`DRAIN_TIMEOUT`].
async fn flush_pending(
    writer: &mut FramedWrite<OwnedWriteHalf, ImCodec>,
    outgoing_rx: &mut mpsc::Receiver<Arc<Message>>,
) {
    let drain = async {
        while let Ok(msg) = outgoing_rx.try_recv() {
            writer.feed(msg).await?;
        }
        SinkExt::<Arc<Message>>::flush(writer).await
    };
    match timeout(DRAIN_TIMEOUT, drain).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Dropping unsent frames"),
        Err(_) => debug!("Timed out flushing unsent frames"),
    }
}

/// Report a terminal failure, unless the session was already disconnected.
fn report(handle: &SessionHandle, observer: &dyn SessionObserver, error: SessionError) {
    if handle.mark_disconnected() {
        observer.on_error(handle, error);
    } else {
        debug!(error = %error, code = error.error_code(), "Suppressed error after disconnect");
    }
}
