//! Message handlers.
//!
//! [`dispatch`] routes every inbound frame by kind. Handlers run
//! synchronously on the session task that read the frame: they take the
//! registry lock, publish through the topic router, and return. Nothing here
//! awaits, so a slow peer can never stall another session's handler.

mod connection;
mod helpers;
mod messaging;
mod roster;

pub use connection::{handle_connect, handle_disconnect};
pub use helpers::{announce_logout, release};
pub use messaging::handle_direct_message;
pub use roster::handle_list_request;

use imsg_proto::{Message, MessageKind};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::state::{NicknameRegistry, SessionHandle, TopicRouter};

/// Everything a handler may touch.
pub struct Context<'a> {
    /// Session the message arrived on.
    pub session: &'a SessionHandle,
    /// Nickname registry. Always locked before the router.
    pub registry: &'a Mutex<NicknameRegistry>,
    /// Subscription table.
    pub router: &'a TopicRouter,
}

/// Route one inbound message to its handler.
pub fn dispatch(ctx: &Context<'_>, msg: Message) {
    trace!(session = %ctx.session.id(), kind = %msg.kind(), len = msg.value().len(), "Dispatch");

    match msg.kind() {
        MessageKind::Connect => handle_connect(ctx, &msg),
        MessageKind::DirectMessage => handle_direct_message(ctx, &msg),
        MessageKind::ListRequest => handle_list_request(ctx, &msg),
        MessageKind::Disconnect => handle_disconnect(ctx, &msg),
        MessageKind::ConnectAck
        | MessageKind::ConnectRefused
        | MessageKind::MessageAck
        | MessageKind::MessageRefused
        | MessageKind::ListResponse
        | MessageKind::DisconnectAck
        | MessageKind::Broadcast => {
            debug!(
                session = %ctx.session.id(),
                kind = %msg.kind(),
                "Ignoring client-bound message"
            );
        }
    }
}
