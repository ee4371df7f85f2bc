//! Shared reply builders and registration bookkeeping.

use std::sync::Arc;

use imsg_proto::Message;

use super::Context;
use crate::error::RegistryError;
use crate::state::{NicknameRegistry, SessionHandle, Topic, TopicRouter};

// ============================================================================
// Reply texts
// ============================================================================

pub fn welcome(nickname: &str) -> String {
    format!("Welcome, {nickname}! You are now connected.")
}

pub fn logged_in(nickname: &str) -> String {
    format!("{nickname} has logged in.")
}

pub fn logged_out(nickname: &str) -> String {
    format!("{nickname} has logged out.")
}

pub fn goodbye(nickname: Option<&str>) -> String {
    match nickname {
        Some(nick) => format!("Goodbye, {nick}."),
        None => "Goodbye.".to_string(),
    }
}

/// `connect-refused` text; always names the requested nickname.
pub fn connect_refused(error: &RegistryError, requested: &str) -> String {
    match error {
        RegistryError::NicknameInUse(_) => {
            format!("Nickname {requested} is already in use. Try another one.")
        }
        RegistryError::InvalidNickname(_) => {
            format!("Nickname {requested} is not valid.")
        }
    }
}

pub fn delivered(destinatary: &str) -> String {
    format!("Message delivered to {destinatary}.")
}

pub fn unknown_user(destinatary: &str) -> String {
    format!("User {destinatary} is not connected.")
}

pub fn not_registered(destinatary: &str) -> String {
    format!("Cannot send to {destinatary}: connect first.")
}

pub const MALFORMED_DIRECT_MESSAGE: &str = "Malformed direct message.";

// ============================================================================
// Delivery helpers
// ============================================================================

/// Send a reply to the requesting session.
///
/// Registered sessions are reached through their nickname topic; sessions
/// that never registered have no topic and are written to directly.
pub fn reply(ctx: &Context<'_>, nickname: Option<&str>, msg: Message) {
    let msg = Arc::new(msg);
    match nickname {
        Some(nick) => {
            ctx.router.publish(&Topic::nickname(nick), ctx.session, msg);
        }
        None => {
            ctx.session.deliver(msg);
        }
    }
}

/// Unregister `session` and drop its subscriptions.
///
/// Returns the nickname only for the caller that actually released it, so
/// at most one "logged out" notice is published per registration.
pub fn release(
    registry: &mut NicknameRegistry,
    router: &TopicRouter,
    session: &SessionHandle,
) -> Option<String> {
    let nickname = registry.unregister(session.id())?;
    router.unsubscribe(&Topic::nickname(nickname.as_str()), session);
    router.unsubscribe(&Topic::Broadcast, session);
    Some(nickname)
}

/// Tell everyone else that `nickname` left.
pub fn announce_logout(router: &TopicRouter, session: &SessionHandle, nickname: &str) -> usize {
    router.publish(
        &Topic::Broadcast,
        session,
        Arc::new(Message::broadcast(logged_out(nickname))),
    )
}
