//! Nickname registry.
//!
//! Bidirectional map between nicknames and the sessions that own them. The
//! key set of the nickname map doubles as the set of registered names.
//! Nicknames are compared byte-for-byte (case-sensitive).

use std::collections::HashMap;

use imsg_proto::validate_nickname;

use crate::error::RegistryError;
use crate::state::SessionId;

/// Registered nicknames and their owners.
#[derive(Debug, Default)]
pub struct NicknameRegistry {
    by_nick: HashMap<String, SessionId>,
    by_session: HashMap<SessionId, String>,
}

impl NicknameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `nickname`.
    ///
    /// Fails if the nickname is not valid on the wire or is already taken.
    /// A session that already owns a nickname is refused the same way as a
    /// taken nickname, whichever name it asks for.
    pub fn register(&mut self, nickname: &str, session: SessionId) -> Result<(), RegistryError> {
        if validate_nickname(nickname).is_err() {
            return Err(RegistryError::InvalidNickname(nickname.to_string()));
        }
        if self.by_session.contains_key(&session) || self.by_nick.contains_key(nickname) {
            return Err(RegistryError::NicknameInUse(nickname.to_string()));
        }
        self.by_nick.insert(nickname.to_string(), session);
        self.by_session.insert(session, nickname.to_string());
        Ok(())
    }

    /// Remove the session's registration, returning the nickname it held.
    ///
    /// Returns `None` when the session was not registered, so concurrent
    /// teardown paths can tell which of them actually released it.
    pub fn unregister(&mut self, session: SessionId) -> Option<String> {
        let nickname = self.by_session.remove(&session)?;
        match self.by_nick.get(&nickname) {
            Some(owner) if *owner == session => {
                self.by_nick.remove(&nickname);
            }
            _ => tracing::warn!(%session, %nickname, "Nickname map out of sync"),
        }
        Some(nickname)
    }

    /// Session owning `nickname`, if any.
    pub fn lookup(&self, nickname: &str) -> Option<SessionId> {
        self.by_nick.get(nickname).copied()
    }

    /// Nickname owned by `session`, if any.
    pub fn nickname_of(&self, session: SessionId) -> Option<&str> {
        self.by_session.get(&session).map(String::as_str)
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.by_nick.contains_key(nickname)
    }

    /// All registered nicknames, sorted.
    pub fn nicknames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_nick.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_nick.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nick.is_empty()
    }
}
