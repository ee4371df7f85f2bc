//! Registration handlers: `connect` and `disconnect`.

use std::sync::Arc;

use imsg_proto::Message;
use tracing::info;

use super::Context;
use super::helpers;
use crate::state::Topic;

/// Register the session under the requested nickname.
///
/// On success the session is subscribed to its own topic and the broadcast
/// topic, receives `connect-ack`, and everyone else is told it logged in.
/// Any failure is answered with `connect-refused` written straight to the
/// session, which stays unregistered.
pub fn handle_connect(ctx: &Context<'_>, msg: &Message) {
    let nickname = msg.value();
    let mut registry = ctx.registry.lock();

    if let Err(e) = registry.register(nickname, ctx.session.id()) {
        info!(
            session = %ctx.session.id(),
            %nickname,
            error = %e,
            code = e.error_code(),
            "Connect refused"
        );
        ctx.session
            .deliver(Arc::new(Message::connect_refused(helpers::connect_refused(
                &e, nickname,
            ))));
        return;
    }

    let own = Topic::nickname(nickname);
    ctx.router.subscribe(own.clone(), ctx.session);
    ctx.router.subscribe(Topic::Broadcast, ctx.session);

    ctx.router.publish(
        &own,
        ctx.session,
        Arc::new(Message::connect_ack(helpers::welcome(nickname))),
    );
    let notified = ctx.router.publish(
        &Topic::Broadcast,
        ctx.session,
        Arc::new(Message::broadcast(helpers::logged_in(nickname))),
    );

    info!(
        session = %ctx.session.id(),
        addr = %ctx.session.addr(),
        %nickname,
        notified,
        users = registry.len(),
        "User registered"
    );
}

/// End the session gracefully.
///
/// The nickname is released before the acknowledgement goes out; the socket
/// is left open for the peer to close once it has read `disconnect-ack`.
pub fn handle_disconnect(ctx: &Context<'_>, _msg: &Message) {
    let mut registry = ctx.registry.lock();
    let released = helpers::release(&mut registry, ctx.router, ctx.session);

    ctx.session.deliver(Arc::new(Message::disconnect_ack(helpers::goodbye(
        released.as_deref(),
    ))));

    if let Some(nickname) = released {
        helpers::announce_logout(ctx.router, ctx.session, &nickname);
        info!(session = %ctx.session.id(), %nickname, "User disconnected");
    } else {
        info!(session = %ctx.session.id(), "Unregistered session disconnected");
    }
    drop(registry);

    ctx.session.disconnect(false);
}
