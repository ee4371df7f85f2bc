//! Session observer trait.
//!
//! A [`Session`](crate::network::Session) knows nothing about nicknames or
//! topics; it reports everything it reads and how it ended to the observer
//! it was constructed with.

use imsg_proto::Message;

use crate::error::SessionError;
use crate::state::SessionHandle;

/// Receives inbound traffic and lifecycle events from sessions.
pub trait SessionObserver: Send + Sync {
    /// Called for every fully decoded frame while the session is connected.
    fn on_message(&self, session: &SessionHandle, msg: Message);

    /// Called at most once per session, for the first decode or transport
    /// failure seen while it was still connected.
    fn on_error(&self, session: &SessionHandle, error: SessionError);

    /// Called exactly once, after the session task has stopped.
    fn on_closed(&self, session: &SessionHandle);
}
