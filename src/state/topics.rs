//! Topic router.
//!
//! Publish/subscribe fan-out from a [`Topic`] to the sessions subscribed to
//! it. Every registered session subscribes to its own nickname topic and to
//! [`Topic::Broadcast`].
//!
//! # Locking
//!
//! The subscription table sits behind one `RwLock`: `publish` takes the read
//! lock, `subscribe`/`unsubscribe` the write lock. Deliveries never block and
//! never call back into the caller, so the router can be used while the
//! registry mutex is held (lock order: registry, then router).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use imsg_proto::Message;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::state::SessionHandle;

/// A delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Private topic of the session registered under this nickname.
    Nickname(String),
    /// Every registered session.
    Broadcast,
}

impl Topic {
    pub fn nickname(nickname: impl Into<String>) -> Self {
        Self::Nickname(nickname.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nickname(nick) => write!(f, "@{nick}"),
            Self::Broadcast => f.write_str("*broadcast*"),
        }
    }
}

/// Subscription table keyed by topic.
#[derive(Debug, Default)]
pub struct TopicRouter {
    topics: RwLock<HashMap<Topic, Vec<SessionHandle>>>,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `session` to `topic`, creating the topic if needed.
    pub fn subscribe(&self, topic: Topic, session: &SessionHandle) {
        let mut topics = self.topics.write();
        let subscribers = topics.entry(topic).or_default();
        if !subscribers.contains(session) {
            subscribers.push(session.clone());
        }
    }

    /// Remove `session` from `topic`, dropping the topic once empty.
    pub fn unsubscribe(&self, topic: &Topic, session: &SessionHandle) {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            debug!(%topic, session = %session.id(), "Unsubscribe from unknown topic");
            return;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s != session);
        if subscribers.len() == before {
            debug!(%topic, session = %session.id(), "Session was not subscribed");
        }
        if subscribers.is_empty() {
            topics.remove(topic);
        }
    }

    /// Deliver `msg` to every subscriber of `topic`.
    ///
    /// On [`Topic::Broadcast`] the `origin` session is skipped. Returns the
    /// number of sessions the message was queued for.
    pub fn publish(&self, topic: &Topic, origin: &SessionHandle, msg: Arc<Message>) -> usize {
        let topics = self.topics.read();
        let Some(subscribers) = topics.get(topic) else {
            debug!(%topic, kind = %msg.kind(), "Publish to topic without subscribers");
            return 0;
        };

        let mut delivered = 0;
        for subscriber in subscribers {
            if *topic == Topic::Broadcast && subscriber == origin {
                continue;
            }
            if subscriber.deliver(Arc::clone(&msg)) {
                delivered += 1;
            }
        }
        trace!(%topic, kind = %msg.kind(), delivered, "Published");
        delivered
    }

    /// Number of sessions subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }
}
