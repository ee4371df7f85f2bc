//! Direct message handler.

use std::sync::Arc;

use imsg_proto::Message;
use tracing::{debug, warn};

use super::Context;
use super::helpers;
use crate::state::Topic;

/// Route a `direct-message` from the session's user to its destinatary.
///
/// Lookup, delivery and acknowledgement all happen under the registry lock
/// so the destinatary cannot log out in between.
pub fn handle_direct_message(ctx: &Context<'_>, msg: &Message) {
    let registry = ctx.registry.lock();
    let originator = registry.nickname_of(ctx.session.id());

    let Some((destinatary, body)) = msg.fields() else {
        warn!(session = %ctx.session.id(), value = %msg.value(), "Direct message without separator");
        helpers::reply(
            ctx,
            originator,
            Message::message_refused(helpers::MALFORMED_DIRECT_MESSAGE),
        );
        return;
    };

    let Some(from) = originator else {
        debug!(session = %ctx.session.id(), %destinatary, "Direct message before connect");
        helpers::reply(
            ctx,
            None,
            Message::message_refused(helpers::not_registered(destinatary)),
        );
        return;
    };

    if registry.lookup(destinatary).is_none() {
        debug!(%from, %destinatary, "Direct message to unknown user");
        helpers::reply(
            ctx,
            Some(from),
            Message::message_refused(helpers::unknown_user(destinatary)),
        );
        return;
    }

    let delivered = ctx.router.publish(
        &Topic::nickname(destinatary),
        ctx.session,
        Arc::new(Message::direct_message(from, body)),
    );

    if delivered == 0 {
        debug!(%from, %destinatary, "Destinatary is closing");
        helpers::reply(
            ctx,
            Some(from),
            Message::message_refused(helpers::unknown_user(destinatary)),
        );
        return;
    }

    debug!(%from, %destinatary, len = body.len(), "Direct message routed");
    helpers::reply(
        ctx,
        Some(from),
        Message::message_ack(helpers::delivered(destinatary)),
    );
}
