//! Session manager.
//!
//! Owns every piece of shared state: the session table, the nickname
//! registry and the topic router. It is the [`SessionObserver`] of every
//! session it accepts, turning inbound frames into handler calls and session
//! failures into teardown.
//!
//! # Lock order
//!
//! `registry` (mutex) before the router's internal lock. The session table
//! is a `DashMap` and is never touched while either is held.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use imsg_proto::Message;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::handlers::{self, Context};
use crate::network::Session;
use crate::state::{
    NicknameRegistry, SessionHandle, SessionId, SessionIdGenerator, SessionObserver, TopicRouter,
};

/// Central registry and router for all sessions.
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionHandle>,
    registry: Mutex<NicknameRegistry>,
    router: TopicRouter,
    ids: SessionIdGenerator,
    send_queue: usize,
}

impl SessionManager {
    /// Create a manager whose sessions buffer up to `send_queue` outbound
    /// frames each.
    pub fn new(send_queue: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            registry: Mutex::new(NicknameRegistry::new()),
            router: TopicRouter::new(),
            ids: SessionIdGenerator::new(),
            send_queue,
        }
    }

    /// Wrap an accepted socket in a new session observed by this manager.
    ///
    /// The caller is expected to spawn [`Session::run`].
    pub fn accept(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr) -> Session {
        let id = self.ids.next();
        let observer: Arc<dyn SessionObserver> = self.clone();
        let session = Session::new(id, stream, addr, self.send_queue, observer);
        self.sessions.insert(id, session.handle());
        debug!(session = %id, %addr, total = self.sessions.len(), "Session accepted");
        session
    }

    /// Number of open sessions, registered or not.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of registered nicknames.
    pub fn user_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Registered nicknames, sorted.
    pub fn nicknames(&self) -> Vec<String> {
        self.registry
            .lock()
            .nicknames()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Close every open session. Each one tears itself down through
    /// [`SessionObserver::on_closed`].
    pub fn shutdown(&self) {
        let handles: Vec<SessionHandle> = self.sessions.iter().map(|e| e.value().clone()).collect();
        info!(sessions = handles.len(), "Closing all sessions");
        for handle in handles {
            handle.disconnect(true);
        }
    }

    fn context<'a>(&'a self, session: &'a SessionHandle) -> Context<'a> {
        Context {
            session,
            registry: &self.registry,
            router: &self.router,
        }
    }

    /// Release the session's nickname and announce it, if this call is the
    /// one that actually released it.
    fn teardown(&self, session: &SessionHandle) -> Option<String> {
        let mut registry = self.registry.lock();
        let nickname = handlers::release(&mut registry, &self.router, session)?;
        handlers::announce_logout(&self.router, session, &nickname);
        Some(nickname)
    }
}

impl SessionObserver for SessionManager {
    fn on_message(&self, session: &SessionHandle, msg: Message) {
        handlers::dispatch(&self.context(session), msg);
    }

    fn on_error(&self, session: &SessionHandle, error: SessionError) {
        match &error {
            SessionError::PeerClosed => {
                info!(session = %session.id(), "Connection closed by peer");
            }
            _ => {
                warn!(
                    session = %session.id(),
                    error = %error,
                    code = error.error_code(),
                    "Session failed"
                );
            }
        }
        session.disconnect(false);
        if let Some(nickname) = self.teardown(session) {
            info!(session = %session.id(), %nickname, "User lost");
        }
    }

    fn on_closed(&self, session: &SessionHandle) {
        if self.sessions.remove(&session.id()).is_none() {
            debug!(session = %session.id(), "Session already removed");
        }
        if let Some(nickname) = self.teardown(session) {
            info!(session = %session.id(), %nickname, "User dropped without error");
        }
        debug!(session = %session.id(), total = self.sessions.len(), "Session closed");
    }
}
