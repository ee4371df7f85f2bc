//! Session identity and the shared handle used to reach a live session.
//!
//! A [`SessionHandle`] is the only way other components talk to a session:
//! the topic router stores handles, the registry stores [`SessionId`]s, and
//! the session task itself owns the receiving half of the outbound queue.
//!
//! ```text
//!   Router / Handlers ──deliver()──▶ [bounded mpsc] ──▶ Session task ──▶ socket
//!                     ──disconnect(true)──▶ [Notify] ──▶ Session task stops
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use imsg_proto::Message;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

use crate::error::{DeliveryError, SessionError};

/// Unique identifier for a connection, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:06}", self.0)
    }
}

/// Generates monotonically increasing session ids.
#[derive(Debug)]
pub struct SessionIdGenerator {
    counter: AtomicU64,
}

impl SessionIdGenerator {
    /// Create a generator whose first id is `S000001`.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next unique id.
    pub fn next(&self) -> SessionId {
        SessionId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionShared {
    id: SessionId,
    addr: SocketAddr,
    outgoing: mpsc::Sender<Arc<Message>>,
    connected: AtomicBool,
    close: Notify,
}

/// Cheaply clonable reference to a live session.
///
/// Two handles are equal when they refer to the same session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionShared>,
}

impl SessionHandle {
    /// Create a handle and the receiving end of its outbound queue.
    pub fn new(
        id: SessionId,
        addr: SocketAddr,
        send_queue: usize,
    ) -> (Self, mpsc::Receiver<Arc<Message>>) {
        let (outgoing, outgoing_rx) = mpsc::channel(send_queue.max(1));
        let handle = Self {
            inner: Arc::new(SessionShared {
                id,
                addr,
                outgoing,
                connected: AtomicBool::new(true),
                close: Notify::new(),
            }),
        };
        (handle, outgoing_rx)
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// Whether the session still accepts inbound frames and deliveries.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Enqueue a message at the tail of the outbound queue without waiting.
    pub fn send(&self, msg: Arc<Message>) -> Result<(), DeliveryError> {
        if !self.is_connected() {
            return Err(DeliveryError::Closed);
        }
        self.inner.outgoing.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Enqueue a message, closing the session if its queue is full.
    ///
    /// Returns whether the message was queued.
    pub fn deliver(&self, msg: Arc<Message>) -> bool {
        match self.send(msg) {
            Ok(()) => true,
            Err(DeliveryError::QueueFull) => {
                let err = SessionError::SendQueueExceeded;
                warn!(
                    session = %self.id(),
                    error = %err,
                    code = err.error_code(),
                    "Closing slow session"
                );
                self.disconnect(true);
                false
            }
            Err(e) => {
                debug!(session = %self.id(), code = e.error_code(), "Skipping delivery");
                false
            }
        }
    }

    /// Mark the session disconnected.
    ///
    /// With `close_socket` the session task drops the transport at once;
    /// otherwise the queue keeps draining until the peer closes.
    pub fn disconnect(&self, close_socket: bool) {
        self.inner.connected.store(false, Ordering::Release);
        if close_socket {
            self.inner.close.notify_one();
        }
    }

    /// Clear the connected flag, returning whether it was set.
    pub(crate) fn mark_disconnected(&self) -> bool {
        self.inner.connected.swap(false, Ordering::AcqRel)
    }

    /// Resolves once [`disconnect(true)`](Self::disconnect) has been called.
    pub(crate) async fn close_requested(&self) {
        self.inner.close.notified().await
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SessionHandle {}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("addr", &self.inner.addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_handle(id: u64, send_queue: usize) -> (SessionHandle, mpsc::Receiver<Arc<Message>>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 40000 + id as u16));
    SessionHandle::new(SessionId(id), addr, send_queue)
}
