//! Roster handler.

use imsg_proto::Message;
use tracing::debug;

use super::Context;
use super::helpers;

/// Answer a `list-request` with every registered nickname, sorted.
///
/// Large rosters are cut at the payload limit by
/// [`Message::list_response`]; the reply is not guaranteed complete.
pub fn handle_list_request(ctx: &Context<'_>, _msg: &Message) {
    let registry = ctx.registry.lock();
    let nicknames = registry.nicknames();
    let response = Message::list_response(&nicknames);
    debug!(
        session = %ctx.session.id(),
        users = nicknames.len(),
        listed = response.nicknames().len(),
        "Roster requested"
    );
    helpers::reply(ctx, registry.nickname_of(ctx.session.id()), response);
}
